//! Local Secrets - 호스트 애플리케이션용 로컬 시크릿 보관 라이브러리
//!
//! 자격 증명을 저장 파일이나 배포 코드에 넣지 않고,
//! "현재 시크릿 가져오기" 하나로 세 가지 경로(직접 입력, 세션 캐시, 암호화 파일)를 제공합니다.
//!
//! ```no_run
//! use local_secrets::{SecretPayload, SecretStore, StorageMode, StoreConfig};
//!
//! # fn main() -> Result<(), local_secrets::SecretError> {
//! let store = SecretStore::new(StoreConfig::new("/home/me/.config/myapp"));
//!
//! let mut payload = SecretPayload::new();
//! payload.insert("api_key", "sk-...");
//! store.save(Some("password"), &payload, StorageMode::Disk, false)?;
//!
//! let current = store.load(None)?;
//! assert_eq!(current.get("api_key"), Some("sk-..."));
//! store.clear_session();
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod error;
pub mod models;
pub mod secrets;
pub mod utils;

pub use error::{CommandError, CommandResult, FormatError, SecretError};
pub use models::{Credential, SaveOptions, SecretPayload, StorageMode};
pub use secrets::{Backend, BackendAvailability, KdfProfile, SecretStore, SessionCache, StoreConfig};
