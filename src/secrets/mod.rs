//! Secret Store 모듈
//!
//! 비밀번호 기반 암호화 파일 + 세션 캐시로 시크릿을 관리합니다.
//!
//! - 디스크에는 envelope(`secret.enc`) 하나만 저장 (mode 600)
//! - 백엔드: ChaCha20-Poly1305 (primary) / HMAC keystream (fallback), FLAG로 구분
//! - 세션 캐시는 프로세스 메모리에만 보관하고 clear 시 zeroize

pub mod cipher;
pub mod envelope;
pub mod kdf;
pub mod key_material;
pub mod manager;
pub mod session;
pub mod vault;

pub use cipher::{Backend, BackendAvailability};
pub use kdf::KdfProfile;
pub use manager::{SecretStore, StoreConfig};
pub use session::SessionCache;
