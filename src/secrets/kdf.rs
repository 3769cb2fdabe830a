//! 비밀번호 기반 키 유도
//!
//! - Primary: PBKDF2-HMAC-SHA256 → 256-bit AEAD 키
//! - Fallback: scrypt → 64 bytes 유도 후 (stream 키, HMAC 키)로 분할
//!
//! 비용 파라미터는 envelope에 기록되지 않으므로 포맷 버전의 일부입니다.
//! 값을 바꾸면 envelope VERSION을 올려야 합니다.

use rand::Rng;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::SecretError;

/// Salt 길이 (16 bytes 고정)
pub const SALT_LEN: usize = 16;

/// 유도 키 길이 (256-bit)
pub const KEY_LEN: usize = 32;

/// KDF salt (쓰기마다 새로 생성)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_LEN];
        rand::thread_rng().fill(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

/// KDF 비용 파라미터
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfProfile {
    pub pbkdf2_rounds: u32,
    pub scrypt_log_n: u8,
    pub scrypt_r: u32,
    pub scrypt_p: u32,
}

impl KdfProfile {
    /// envelope VERSION 1 의 기본값
    pub const STANDARD: KdfProfile = KdfProfile {
        pbkdf2_rounds: 600_000,
        scrypt_log_n: 15,
        scrypt_r: 8,
        scrypt_p: 1,
    };

    /// 테스트 전용 저비용 프로파일 (STANDARD로 만든 파일과 호환되지 않음)
    #[cfg(test)]
    pub(crate) const LOW_COST: KdfProfile = KdfProfile {
        pbkdf2_rounds: 1_000,
        scrypt_log_n: 8,
        scrypt_r: 8,
        scrypt_p: 1,
    };
}

impl Default for KdfProfile {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// 256-bit 유도 키 (drop 시 zeroize)
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    pub(crate) const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Fallback 백엔드용 키 쌍
#[derive(Debug, Clone)]
pub struct FallbackKeys {
    pub cipher_key: DerivedKey,
    pub mac_key: DerivedKey,
}

/// Primary 백엔드용 AEAD 키 유도 (PBKDF2-HMAC-SHA256)
#[cfg_attr(not(feature = "aead"), allow(dead_code))]
pub fn derive_aead_key(password: &[u8], salt: &Salt, profile: &KdfProfile) -> DerivedKey {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt.as_bytes(), profile.pbkdf2_rounds, &mut key);
    let derived = DerivedKey(key);
    key.zeroize();
    derived
}

/// Fallback 백엔드용 키 쌍 유도 (scrypt 64 bytes → 32/32 분할)
pub fn derive_fallback_keys(
    password: &[u8],
    salt: &Salt,
    profile: &KdfProfile,
) -> Result<FallbackKeys, SecretError> {
    let params = scrypt::Params::new(
        profile.scrypt_log_n,
        profile.scrypt_r,
        profile.scrypt_p,
        KEY_LEN * 2,
    )
    .map_err(|e| SecretError::Kdf(e.to_string()))?;

    let mut okm = Zeroizing::new([0u8; KEY_LEN * 2]);
    scrypt::scrypt(password, salt.as_bytes(), &params, okm.as_mut_slice())
        .map_err(|e| SecretError::Kdf(e.to_string()))?;

    let mut cipher_key = [0u8; KEY_LEN];
    let mut mac_key = [0u8; KEY_LEN];
    cipher_key.copy_from_slice(&okm[..KEY_LEN]);
    mac_key.copy_from_slice(&okm[KEY_LEN..]);

    let keys = FallbackKeys {
        cipher_key: DerivedKey(cipher_key),
        mac_key: DerivedKey(mac_key),
    };
    cipher_key.zeroize();
    mac_key.zeroize();
    Ok(keys)
}
