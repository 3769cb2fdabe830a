//! Cipher 백엔드
//!
//! 두 백엔드는 같은 인터페이스(`CipherBackend`)를 구현하며,
//! 어떤 백엔드로 암호화했는지는 envelope FLAG 에 기록됩니다.
//!
//! - Primary: ChaCha20-Poly1305 (256-bit key, 96-bit nonce, 128-bit tag)
//! - Fallback: HMAC-SHA256 keystream XOR + HMAC-SHA256 태그 (16 bytes로 절단)
//!
//! 복호화는 저장된 FLAG 기준으로 백엔드를 고르며, 현재 선호 백엔드와 무관합니다.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::error::SecretError;
use crate::secrets::kdf::{derive_fallback_keys, FallbackKeys, KdfProfile, Salt};

/// Nonce 길이 (96-bit)
pub const NONCE_LEN: usize = 12;

/// 인증 태그 길이 (128-bit)
pub const TAG_LEN: usize = 16;

/// FLAG bit 0: primary AEAD
pub const FLAG_PRIMARY: u8 = 0x01;
pub const FLAG_FALLBACK: u8 = 0x02;

type HmacSha256 = Hmac<Sha256>;

/// 암호화에 사용된 백엔드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Primary,
    Fallback,
}

impl Backend {
    pub const fn flag(self) -> u8 {
        match self {
            Backend::Primary => FLAG_PRIMARY,
            Backend::Fallback => FLAG_FALLBACK,
        }
    }

    pub const fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            FLAG_PRIMARY => Some(Backend::Primary),
            FLAG_FALLBACK => Some(Backend::Fallback),
            _ => None,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Primary => f.write_str("primary (ChaCha20-Poly1305)"),
            Backend::Fallback => f.write_str("fallback (HMAC-SHA256 stream)"),
        }
    }
}

/// 런타임에 사용 가능한 백엔드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendAvailability {
    primary: bool,
}

impl BackendAvailability {
    /// `aead` feature 로 primary 구현이 컴파일되었는지 확인
    pub const fn detect() -> Self {
        Self {
            primary: cfg!(feature = "aead"),
        }
    }

    /// Primary 구현이 있어도 fallback만 사용
    pub const fn fallback_only() -> Self {
        Self { primary: false }
    }

    pub const fn is_available(&self, backend: Backend) -> bool {
        match backend {
            Backend::Primary => self.primary && cfg!(feature = "aead"),
            Backend::Fallback => true,
        }
    }

    /// 쓰기에 사용할 백엔드
    pub const fn preferred(&self) -> Backend {
        if self.is_available(Backend::Primary) {
            Backend::Primary
        } else {
            Backend::Fallback
        }
    }
}

impl Default for BackendAvailability {
    fn default() -> Self {
        Self::detect()
    }
}

/// 암호문 + 태그
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
}

/// 백엔드 공통 인터페이스 (키는 생성 시 바인딩)
pub trait CipherBackend {
    fn backend(&self) -> Backend;

    fn encrypt(&self, plaintext: &[u8], nonce: &[u8; NONCE_LEN]) -> Result<Sealed, SecretError>;

    /// 태그 검증에 실패하면 어떤 원인이든 `AuthenticationFailed`
    fn decrypt(
        &self,
        ciphertext: &[u8],
        nonce: &[u8; NONCE_LEN],
        tag: &[u8; TAG_LEN],
    ) -> Result<Zeroizing<Vec<u8>>, SecretError>;
}

/// 비밀번호 + salt 로 키를 유도하여 지정 백엔드를 생성
pub fn open_cipher(
    backend: Backend,
    password: &[u8],
    salt: &Salt,
    profile: &KdfProfile,
    availability: &BackendAvailability,
) -> Result<Box<dyn CipherBackend>, SecretError> {
    if !availability.is_available(backend) {
        return Err(SecretError::BackendUnavailable(backend));
    }

    match backend {
        Backend::Primary => open_primary(password, salt, profile),
        Backend::Fallback => {
            let keys = derive_fallback_keys(password, salt, profile)?;
            Ok(Box::new(FallbackCipher::new(keys)))
        }
    }
}

#[cfg(feature = "aead")]
fn open_primary(
    password: &[u8],
    salt: &Salt,
    profile: &KdfProfile,
) -> Result<Box<dyn CipherBackend>, SecretError> {
    use crate::secrets::kdf::derive_aead_key;

    let key = derive_aead_key(password, salt, profile);
    Ok(Box::new(PrimaryCipher::new(key.as_bytes())))
}

#[cfg(not(feature = "aead"))]
fn open_primary(
    _password: &[u8],
    _salt: &Salt,
    _profile: &KdfProfile,
) -> Result<Box<dyn CipherBackend>, SecretError> {
    Err(SecretError::BackendUnavailable(Backend::Primary))
}

#[cfg(feature = "aead")]
pub use primary::PrimaryCipher;

#[cfg(feature = "aead")]
mod primary {
    use chacha20poly1305::{
        aead::{AeadInPlace, KeyInit},
        ChaCha20Poly1305, Nonce, Tag,
    };
    use zeroize::Zeroizing;

    use super::{Backend, CipherBackend, Sealed, NONCE_LEN, TAG_LEN};
    use crate::error::SecretError;
    use crate::secrets::kdf::KEY_LEN;

    /// ChaCha20-Poly1305 백엔드
    pub struct PrimaryCipher {
        cipher: ChaCha20Poly1305,
    }

    impl PrimaryCipher {
        pub fn new(key: &[u8; KEY_LEN]) -> Self {
            Self {
                cipher: ChaCha20Poly1305::new(key.into()),
            }
        }
    }

    impl CipherBackend for PrimaryCipher {
        fn backend(&self) -> Backend {
            Backend::Primary
        }

        fn encrypt(&self, plaintext: &[u8], nonce: &[u8; NONCE_LEN]) -> Result<Sealed, SecretError> {
            let mut buffer = plaintext.to_vec();
            let tag = self
                .cipher
                .encrypt_in_place_detached(Nonce::from_slice(nonce), b"", &mut buffer)
                .map_err(|e| SecretError::Encryption(e.to_string()))?;

            // envelope 크기 불변식 (어기면 구현 버그)
            assert_eq!(buffer.len(), plaintext.len(), "AEAD ciphertext length mismatch");
            let mut tag_bytes = [0u8; TAG_LEN];
            tag_bytes.copy_from_slice(&tag);

            Ok(Sealed {
                ciphertext: buffer,
                tag: tag_bytes,
            })
        }

        fn decrypt(
            &self,
            ciphertext: &[u8],
            nonce: &[u8; NONCE_LEN],
            tag: &[u8; TAG_LEN],
        ) -> Result<Zeroizing<Vec<u8>>, SecretError> {
            let mut buffer = Zeroizing::new(ciphertext.to_vec());
            self.cipher
                .decrypt_in_place_detached(
                    Nonce::from_slice(nonce),
                    b"",
                    buffer.as_mut_slice(),
                    Tag::from_slice(tag),
                )
                .map_err(|_| SecretError::AuthenticationFailed)?;
            Ok(buffer)
        }
    }
}

/// HMAC-SHA256 keystream + HMAC 태그 백엔드 (외부 AEAD 의존성 없음)
pub struct FallbackCipher {
    keys: FallbackKeys,
}

impl FallbackCipher {
    pub fn new(keys: FallbackKeys) -> Self {
        Self { keys }
    }

    fn hmac(key: &[u8]) -> Result<HmacSha256, SecretError> {
        HmacSha256::new_from_slice(key).map_err(|e| SecretError::Encryption(e.to_string()))
    }

    /// block_i = HMAC(cipher_key, nonce || u32_be(i)), 평문 길이만큼 XOR
    fn apply_keystream(&self, nonce: &[u8; NONCE_LEN], data: &mut [u8]) -> Result<(), SecretError> {
        for (counter, chunk) in data.chunks_mut(32).enumerate() {
            let mut mac = Self::hmac(self.keys.cipher_key.as_bytes())?;
            mac.update(nonce);
            mac.update(&(counter as u32).to_be_bytes());
            let mut block = [0u8; 32];
            block.copy_from_slice(&mac.finalize().into_bytes());
            for (byte, key_byte) in chunk.iter_mut().zip(block.iter()) {
                *byte ^= key_byte;
            }
            block.zeroize();
        }
        Ok(())
    }

    fn tag_mac(&self, nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> Result<HmacSha256, SecretError> {
        let mut mac = Self::hmac(self.keys.mac_key.as_bytes())?;
        mac.update(nonce);
        mac.update(ciphertext);
        Ok(mac)
    }
}

impl CipherBackend for FallbackCipher {
    fn backend(&self) -> Backend {
        Backend::Fallback
    }

    fn encrypt(&self, plaintext: &[u8], nonce: &[u8; NONCE_LEN]) -> Result<Sealed, SecretError> {
        let mut ciphertext = plaintext.to_vec();
        self.apply_keystream(nonce, &mut ciphertext)?;

        let digest = self.tag_mac(nonce, &ciphertext)?.finalize().into_bytes();
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&digest[..TAG_LEN]);

        Ok(Sealed { ciphertext, tag })
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        nonce: &[u8; NONCE_LEN],
        tag: &[u8; TAG_LEN],
    ) -> Result<Zeroizing<Vec<u8>>, SecretError> {
        // 태그를 먼저 상수 시간으로 검증한 뒤에만 평문을 만든다
        self.tag_mac(nonce, ciphertext)?
            .verify_truncated_left(tag)
            .map_err(|_| SecretError::AuthenticationFailed)?;

        let mut plaintext = Zeroizing::new(ciphertext.to_vec());
        self.apply_keystream(nonce, plaintext.as_mut_slice())?;
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::kdf::{DerivedKey, KEY_LEN};

    fn fallback_with(cipher_key: u8, mac_key: u8) -> FallbackCipher {
        FallbackCipher::new(FallbackKeys {
            cipher_key: DerivedKey::from_bytes([cipher_key; KEY_LEN]),
            mac_key: DerivedKey::from_bytes([mac_key; KEY_LEN]),
        })
    }

    #[test]
    fn test_flag_mapping() {
        assert_eq!(Backend::from_flag(Backend::Primary.flag()), Some(Backend::Primary));
        assert_eq!(Backend::from_flag(Backend::Fallback.flag()), Some(Backend::Fallback));
        assert_eq!(Backend::Primary.flag() & 0x01, 0x01);
        assert_eq!(Backend::Fallback.flag() & 0x01, 0x00);
        assert_eq!(Backend::from_flag(0x00), None);
        assert_eq!(Backend::from_flag(0x03), None);
    }

    #[test]
    fn test_fallback_roundtrip_spans_multiple_blocks() {
        let cipher = fallback_with(1, 2);
        let nonce = [9u8; NONCE_LEN];
        let plaintext: Vec<u8> = (0..100u8).collect();

        let sealed = cipher.encrypt(&plaintext, &nonce).unwrap();
        assert_eq!(sealed.ciphertext.len(), plaintext.len());
        assert_ne!(sealed.ciphertext, plaintext);

        let opened = cipher.decrypt(&sealed.ciphertext, &nonce, &sealed.tag).unwrap();
        assert_eq!(opened.as_slice(), plaintext.as_slice());
    }

    #[test]
    fn test_fallback_rejects_tampering_and_wrong_keys() {
        let cipher = fallback_with(1, 2);
        let nonce = [3u8; NONCE_LEN];
        let sealed = cipher.encrypt(b"{\"api_key\":\"sk\"}", &nonce).unwrap();

        let mut bad_ct = sealed.ciphertext.clone();
        bad_ct[0] ^= 0x80;
        assert!(matches!(
            cipher.decrypt(&bad_ct, &nonce, &sealed.tag),
            Err(SecretError::AuthenticationFailed)
        ));

        let mut bad_tag = sealed.tag;
        bad_tag[TAG_LEN - 1] ^= 0x01;
        assert!(matches!(
            cipher.decrypt(&sealed.ciphertext, &nonce, &bad_tag),
            Err(SecretError::AuthenticationFailed)
        ));

        let mut bad_nonce = nonce;
        bad_nonce[0] ^= 0x01;
        assert!(matches!(
            cipher.decrypt(&sealed.ciphertext, &bad_nonce, &sealed.tag),
            Err(SecretError::AuthenticationFailed)
        ));

        let other = fallback_with(1, 4);
        assert!(matches!(
            other.decrypt(&sealed.ciphertext, &nonce, &sealed.tag),
            Err(SecretError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_fallback_empty_plaintext() {
        let cipher = fallback_with(5, 6);
        let nonce = [0u8; NONCE_LEN];
        let sealed = cipher.encrypt(b"", &nonce).unwrap();
        assert!(sealed.ciphertext.is_empty());
        assert!(cipher.decrypt(&[], &nonce, &sealed.tag).unwrap().is_empty());
    }

    #[cfg(feature = "aead")]
    #[test]
    fn test_primary_roundtrip_and_tamper() {
        let cipher = PrimaryCipher::new(&[7u8; KEY_LEN]);
        let nonce = [1u8; NONCE_LEN];
        let sealed = cipher.encrypt(b"top secret", &nonce).unwrap();
        assert_eq!(sealed.ciphertext.len(), b"top secret".len());

        let opened = cipher.decrypt(&sealed.ciphertext, &nonce, &sealed.tag).unwrap();
        assert_eq!(opened.as_slice(), b"top secret");

        let mut bad_tag = sealed.tag;
        bad_tag[0] ^= 0x01;
        assert!(matches!(
            cipher.decrypt(&sealed.ciphertext, &nonce, &bad_tag),
            Err(SecretError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_availability() {
        let fallback = BackendAvailability::fallback_only();
        assert!(!fallback.is_available(Backend::Primary));
        assert!(fallback.is_available(Backend::Fallback));
        assert_eq!(fallback.preferred(), Backend::Fallback);

        let detected = BackendAvailability::detect();
        assert_eq!(detected.is_available(Backend::Primary), cfg!(feature = "aead"));
    }

    #[test]
    fn test_open_cipher_refuses_unavailable_backend() {
        let salt = Salt::random();
        let result = open_cipher(
            Backend::Primary,
            b"pw",
            &salt,
            &KdfProfile::LOW_COST,
            &BackendAvailability::fallback_only(),
        );
        assert!(matches!(
            result,
            Err(SecretError::BackendUnavailable(Backend::Primary))
        ));
    }
}
