//! Envelope 파일 I/O 및 암호화/복호화
//!
//! 쓰기마다 salt 와 nonce 를 새로 생성하고, envelope 을 atomic 하게 저장합니다.
//! 복호화는 FLAG 에 기록된 백엔드로만 시도합니다.

use std::path::{Path, PathBuf};

use rand::Rng;
use tracing::{debug, info};

use crate::error::SecretError;
use crate::models::SecretPayload;
use crate::secrets::cipher::{open_cipher, Backend, BackendAvailability, NONCE_LEN};
use crate::secrets::envelope::Envelope;
use crate::secrets::kdf::{KdfProfile, Salt};
use crate::utils::{read_private_file, write_private_file};

/// Envelope 파일 이름
pub const SECRET_FILE_NAME: &str = "secret.enc";

/// 시크릿 디렉토리 기반 envelope 경로 생성
pub fn get_secret_path(secret_dir: &Path) -> PathBuf {
    secret_dir.join(SECRET_FILE_NAME)
}

pub(crate) fn random_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill(&mut nonce);
    nonce
}

/// 페이로드를 암호화하여 envelope 생성 (salt/nonce 새로 생성)
pub fn seal_payload(
    password: &[u8],
    payload: &SecretPayload,
    backend: Backend,
    profile: &KdfProfile,
    availability: &BackendAvailability,
) -> Result<Envelope, SecretError> {
    let plaintext = zeroize::Zeroizing::new(payload.to_json()?);

    let salt = Salt::random();
    let nonce = random_nonce();

    let cipher = open_cipher(backend, password, &salt, profile, availability)?;
    let sealed = cipher.encrypt(&plaintext, &nonce)?;

    Ok(Envelope::new(cipher.backend(), salt, nonce, sealed))
}

/// envelope 을 복호화하여 페이로드 복원
pub fn open_envelope(
    password: &[u8],
    envelope: &Envelope,
    profile: &KdfProfile,
    availability: &BackendAvailability,
) -> Result<SecretPayload, SecretError> {
    let cipher = open_cipher(envelope.backend, password, &envelope.salt, profile, availability)?;
    let plaintext = cipher.decrypt(&envelope.ciphertext, &envelope.nonce, &envelope.tag)?;
    Ok(SecretPayload::from_json(&plaintext)?)
}

/// 비밀번호로 페이로드를 암호화하고 envelope 파일에 저장
pub fn encrypt_and_write(
    path: &Path,
    password: &[u8],
    payload: &SecretPayload,
    profile: &KdfProfile,
    availability: &BackendAvailability,
) -> Result<Backend, SecretError> {
    let backend = availability.preferred();
    if backend == Backend::Fallback {
        debug!("primary AEAD backend unavailable, writing with fallback cipher");
    }

    let envelope = seal_payload(password, payload, backend, profile, availability)?;
    write_private_file(path, &envelope.encode())?;

    info!(path = %path.display(), backend = %envelope.backend, "encrypted secret written");
    Ok(envelope.backend)
}

/// envelope 파일을 읽고 비밀번호로 복호화
pub fn read_and_decrypt(
    path: &Path,
    password: &[u8],
    profile: &KdfProfile,
    availability: &BackendAvailability,
) -> Result<SecretPayload, SecretError> {
    let envelope = read_envelope(path)?;
    let payload = open_envelope(password, &envelope, profile, availability)?;
    info!(path = %path.display(), "encrypted secret loaded");
    Ok(payload)
}

/// envelope 파일 읽기 + 프레이밍 검증만 수행
pub fn read_envelope(path: &Path) -> Result<Envelope, SecretError> {
    let bytes = read_private_file(path)?;
    Ok(Envelope::decode(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;
    use tempfile::tempdir;

    fn payload() -> SecretPayload {
        [("secret_id", "AKIDxxxx"), ("secret_key", "sk-test123")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let dir = tempdir().unwrap();
        let path = get_secret_path(dir.path());
        let availability = BackendAvailability::detect();

        let backend =
            encrypt_and_write(&path, b"pw", &payload(), &KdfProfile::LOW_COST, &availability)
                .unwrap();
        assert_eq!(backend, availability.preferred());

        let decrypted =
            read_and_decrypt(&path, b"pw", &KdfProfile::LOW_COST, &availability).unwrap();
        assert_eq!(decrypted, payload());
    }

    #[test]
    fn test_fallback_roundtrip_and_flag() {
        let dir = tempdir().unwrap();
        let path = get_secret_path(dir.path());
        let availability = BackendAvailability::fallback_only();

        let backend =
            encrypt_and_write(&path, b"pw", &payload(), &KdfProfile::LOW_COST, &availability)
                .unwrap();
        assert_eq!(backend, Backend::Fallback);
        assert_eq!(read_envelope(&path).unwrap().backend, Backend::Fallback);

        let decrypted =
            read_and_decrypt(&path, b"pw", &KdfProfile::LOW_COST, &availability).unwrap();
        assert_eq!(decrypted, payload());
    }

    #[test]
    fn test_wrong_key_fails() {
        let dir = tempdir().unwrap();
        let path = get_secret_path(dir.path());
        let availability = BackendAvailability::detect();

        encrypt_and_write(&path, b"pw-1", &payload(), &KdfProfile::LOW_COST, &availability)
            .unwrap();

        let result = read_and_decrypt(&path, b"pw-2", &KdfProfile::LOW_COST, &availability);
        assert!(matches!(result, Err(SecretError::AuthenticationFailed)));
    }

    #[test]
    fn test_foreign_file_is_format_error() {
        let dir = tempdir().unwrap();
        let path = get_secret_path(dir.path());
        std::fs::write(&path, b"not an envelope ".repeat(5)).unwrap();

        let result = read_and_decrypt(
            &path,
            b"pw",
            &KdfProfile::LOW_COST,
            &BackendAvailability::detect(),
        );
        assert!(matches!(
            result,
            Err(SecretError::Format(FormatError::BadMagic))
        ));
    }
}
