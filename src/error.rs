//! Local Secrets Error Types
//!
//! 시크릿 저장소 전역 에러 타입 정의

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::secrets::cipher::Backend;

/// Envelope 프레이밍 오류
///
/// 복호화 이전 단계(길이/매직/버전/플래그)에서만 발생하며,
/// 잘못된 비밀번호와 절대 혼동되지 않아야 합니다.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("envelope too short: {len} bytes (minimum {min})")]
    TooShort { len: usize, min: usize },

    #[error("invalid envelope magic")]
    BadMagic,

    #[error("unsupported envelope version: {0}")]
    UnsupportedVersion(u8),

    #[error("unknown backend flag: {0:#04x}")]
    UnknownFlag(u8),
}

/// 시크릿 저장소 에러
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Cipher backend unavailable: {0}")]
    BackendUnavailable(Backend),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Authentication failed. Incorrect password or corrupted file.")]
    AuthenticationFailed,

    #[error("Encrypted secret not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Disk storage is not supported in portable mode")]
    PortableModeUnsupported,

    #[error("Permission error on {}: {source}", path.display())]
    Permission {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Password is required for disk mode")]
    PasswordRequired,

    #[error("KDF configuration error: {0}")]
    Kdf(String),
}

impl SecretError {
    /// 호스트 UI에 전달되는 안정적인 에러 코드
    pub fn code(&self) -> &'static str {
        match self {
            SecretError::Format(_) => "FORMAT_ERROR",
            SecretError::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            SecretError::Encryption(_) => "ENCRYPTION_ERROR",
            SecretError::AuthenticationFailed => "AUTHENTICATION_FAILED",
            SecretError::FileNotFound(_) => "FILE_NOT_FOUND",
            SecretError::PortableModeUnsupported => "PORTABLE_MODE_UNSUPPORTED",
            SecretError::Permission { .. } => "PERMISSION_ERROR",
            SecretError::Io(_) => "IO_ERROR",
            SecretError::Payload(_) => "PAYLOAD_ERROR",
            SecretError::PasswordRequired => "PASSWORD_REQUIRED",
            SecretError::Kdf(_) => "KDF_ERROR",
        }
    }
}

/// 호스트 응답용 직렬화 가능한 에러
#[derive(Debug, Serialize)]
pub struct CommandError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl From<SecretError> for CommandError {
    fn from(error: SecretError) -> Self {
        let details = match &error {
            SecretError::Format(inner) => Some(inner.to_string()),
            SecretError::BackendUnavailable(backend) => Some(backend.to_string()),
            _ => None,
        };

        CommandError {
            code: error.code().to_string(),
            message: error.to_string(),
            details,
        }
    }
}

/// 호스트 명령 결과 타입
pub type CommandResult<T> = Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_codes() {
        let err: CommandError = SecretError::AuthenticationFailed.into();
        assert_eq!(err.code, "AUTHENTICATION_FAILED");
        assert!(err.details.is_none());

        let err: CommandError = SecretError::Format(FormatError::UnsupportedVersion(9)).into();
        assert_eq!(err.code, "FORMAT_ERROR");
        assert_eq!(err.details.as_deref(), Some("unsupported envelope version: 9"));

        let err: CommandError = SecretError::BackendUnavailable(Backend::Primary).into();
        assert_eq!(err.code, "BACKEND_UNAVAILABLE");
    }
}
