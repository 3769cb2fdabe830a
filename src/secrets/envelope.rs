//! Envelope 바이너리 포맷 (v1)
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     magic ("SKEV")
//! 4       1     version
//! 5       1     flag (0x01 primary, 0x02 fallback)
//! 6       16    salt
//! 22      12    nonce
//! 34      n     ciphertext
//! 34+n    16    tag
//! ```

use crate::error::FormatError;
use crate::secrets::cipher::{Backend, Sealed, NONCE_LEN, TAG_LEN};
use crate::secrets::kdf::{Salt, SALT_LEN};

/// 파일 매직 (4 bytes)
pub const ENVELOPE_MAGIC: &[u8; 4] = b"SKEV";

/// 현재 envelope 버전
pub const ENVELOPE_VERSION: u8 = 1;

const HEADER_LEN: usize = ENVELOPE_MAGIC.len() + 1 + 1 + SALT_LEN + NONCE_LEN;

/// 고정 필드 전체 길이 (ciphertext 0 bytes 기준)
pub const MIN_ENVELOPE_LEN: usize = HEADER_LEN + TAG_LEN;

/// 디스크에 저장되는 암호화 레코드
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub version: u8,
    pub backend: Backend,
    pub salt: Salt,
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
}

impl Envelope {
    /// 현재 버전으로 envelope 생성
    pub fn new(backend: Backend, salt: Salt, nonce: [u8; NONCE_LEN], sealed: Sealed) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            backend,
            salt,
            nonce,
            ciphertext: sealed.ciphertext,
            tag: sealed.tag,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MIN_ENVELOPE_LEN + self.ciphertext.len());
        buf.extend_from_slice(ENVELOPE_MAGIC);
        buf.push(self.version);
        buf.push(self.backend.flag());
        buf.extend_from_slice(self.salt.as_bytes());
        buf.extend_from_slice(&self.nonce);
        buf.extend_from_slice(&self.ciphertext);
        buf.extend_from_slice(&self.tag);
        buf
    }

    /// 검증 순서: 길이 → magic → version → flag
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < MIN_ENVELOPE_LEN {
            return Err(FormatError::TooShort {
                len: bytes.len(),
                min: MIN_ENVELOPE_LEN,
            });
        }

        let (magic, rest) = bytes.split_at(ENVELOPE_MAGIC.len());
        if magic != ENVELOPE_MAGIC {
            return Err(FormatError::BadMagic);
        }

        let version = rest[0];
        if version != ENVELOPE_VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }

        let flag = rest[1];
        let backend = Backend::from_flag(flag).ok_or(FormatError::UnknownFlag(flag))?;

        let rest = &rest[2..];
        let (salt, rest) = rest.split_at(SALT_LEN);
        let (nonce, rest) = rest.split_at(NONCE_LEN);
        let (ciphertext, tag) = rest.split_at(rest.len() - TAG_LEN);

        let mut salt_bytes = [0u8; SALT_LEN];
        salt_bytes.copy_from_slice(salt);
        let mut nonce_bytes = [0u8; NONCE_LEN];
        nonce_bytes.copy_from_slice(nonce);
        let mut tag_bytes = [0u8; TAG_LEN];
        tag_bytes.copy_from_slice(tag);

        Ok(Self {
            version,
            backend,
            salt: Salt::from_bytes(salt_bytes),
            nonce: nonce_bytes,
            ciphertext: ciphertext.to_vec(),
            tag: tag_bytes,
        })
    }
}
