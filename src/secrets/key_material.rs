//! 비밀번호 기억하기 (DiskKeyMaterial)
//!
//! - `.pwd.key`: 32 bytes 랜덤 키
//! - `.pwd`: nonce(12) || 암호문 || tag(16)
//!
//! 암호문은 fallback 백엔드와 같은 구성(HMAC keystream + HMAC 태그)이며,
//! 키는 키 파일에서 라벨별 HMAC-SHA256 으로 분리합니다.
//! 키 파일은 머신 로컬 자료이므로 portable 모드에서는 만들지 않습니다.

use std::path::{Path, PathBuf};

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use tracing::info;
use zeroize::{Zeroize, Zeroizing};

use crate::error::SecretError;
use crate::secrets::cipher::{CipherBackend, FallbackCipher, NONCE_LEN, TAG_LEN};
use crate::secrets::kdf::{DerivedKey, FallbackKeys, KEY_LEN};
use crate::secrets::vault::random_nonce;
use crate::utils::{read_private_file, remove_if_exists, write_private_file};

pub const PASSWORD_KEY_FILE_NAME: &str = ".pwd.key";
pub const PASSWORD_FILE_NAME: &str = ".pwd";

const LABEL_STREAM: &[u8] = b"stream";
const LABEL_MAC: &[u8] = b"mac";

/// 비밀번호 보관용 보조 파일 쌍
#[derive(Debug, Clone)]
pub struct DiskKeyMaterial {
    key_path: PathBuf,
    body_path: PathBuf,
}

impl DiskKeyMaterial {
    pub fn in_dir(secret_dir: &Path) -> Self {
        Self {
            key_path: secret_dir.join(PASSWORD_KEY_FILE_NAME),
            body_path: secret_dir.join(PASSWORD_FILE_NAME),
        }
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    pub fn body_path(&self) -> &Path {
        &self.body_path
    }

    pub fn exists(&self) -> bool {
        self.key_path.exists() && self.body_path.exists()
    }

    /// 새 키 파일을 만들고 비밀번호를 저장 (재저장 시 키도 재생성)
    pub fn store(&self, password: &str) -> Result<(), SecretError> {
        let mut file_key = Zeroizing::new([0u8; KEY_LEN]);
        rand::thread_rng().fill(&mut file_key[..]);

        let nonce = random_nonce();
        let sealed = Self::cipher(&file_key)?.encrypt(password.as_bytes(), &nonce)?;

        let mut body = Vec::with_capacity(NONCE_LEN + sealed.ciphertext.len() + TAG_LEN);
        body.extend_from_slice(&nonce);
        body.extend_from_slice(&sealed.ciphertext);
        body.extend_from_slice(&sealed.tag);

        write_private_file(&self.key_path, file_key.as_slice())?;
        write_private_file(&self.body_path, &body)?;

        info!("password persisted to disk key material");
        Ok(())
    }

    /// 저장된 비밀번호 복원 (파일이 없으면 None)
    pub fn load(&self) -> Result<Option<Zeroizing<String>>, SecretError> {
        if !self.exists() {
            return Ok(None);
        }

        let key_bytes = Zeroizing::new(read_private_file(&self.key_path)?);
        let body = read_private_file(&self.body_path)?;

        let file_key: [u8; KEY_LEN] = key_bytes
            .as_slice()
            .try_into()
            .map_err(|_| SecretError::AuthenticationFailed)?;
        let file_key = Zeroizing::new(file_key);
        if body.len() < NONCE_LEN + TAG_LEN {
            return Err(SecretError::AuthenticationFailed);
        }

        let (nonce, rest) = body.split_at(NONCE_LEN);
        let (ciphertext, tag) = rest.split_at(rest.len() - TAG_LEN);
        let mut nonce_bytes = [0u8; NONCE_LEN];
        nonce_bytes.copy_from_slice(nonce);
        let mut tag_bytes = [0u8; TAG_LEN];
        tag_bytes.copy_from_slice(tag);

        let mut plaintext = Self::cipher(&file_key)?.decrypt(ciphertext, &nonce_bytes, &tag_bytes)?;
        let password = String::from_utf8(std::mem::take(&mut *plaintext))
            .map_err(|e| {
                e.into_bytes().zeroize();
                SecretError::AuthenticationFailed
            })?;

        info!("password loaded from disk key material");
        Ok(Some(Zeroizing::new(password)))
    }

    /// 두 파일 모두 삭제 (idempotent)
    pub fn remove(&self) -> Result<(), SecretError> {
        remove_if_exists(&self.body_path)?;
        remove_if_exists(&self.key_path)?;
        Ok(())
    }

    fn cipher(file_key: &[u8; KEY_LEN]) -> Result<FallbackCipher, SecretError> {
        Ok(FallbackCipher::new(FallbackKeys {
            cipher_key: Self::split_key(file_key, LABEL_STREAM)?,
            mac_key: Self::split_key(file_key, LABEL_MAC)?,
        }))
    }

    fn split_key(file_key: &[u8; KEY_LEN], label: &[u8]) -> Result<DerivedKey, SecretError> {
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(file_key)
            .map_err(|e| SecretError::Encryption(e.to_string()))?;
        mac.update(label);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&mac.finalize().into_bytes());
        Ok(DerivedKey::from_bytes(bytes))
    }
}
