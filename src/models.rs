//! Local Secrets Data Models
//!
//! 호스트 애플리케이션과 주고받는 데이터 모델

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// 암호화 대상 시크릿 페이로드 (문자열 키 → 문자열 값)
///
/// JSON 객체로 직렬화되어 암호화됩니다. drop 시 값이 zeroize 됩니다.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretPayload {
    entries: BTreeMap<String, String>,
}

impl SecretPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        if let Some(mut old) = self.entries.insert(key.into(), value.into()) {
            old.zeroize();
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON 바이트로 직렬화 (암호화 직전에만 사용)
    pub(crate) fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub(crate) fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SecretPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut payload = SecretPayload::new();
        for (key, value) in iter {
            payload.insert(key, value);
        }
        payload
    }
}

impl Zeroize for SecretPayload {
    fn zeroize(&mut self) {
        for value in self.entries.values_mut() {
            value.zeroize();
        }
        self.entries.clear();
    }
}

impl Drop for SecretPayload {
    fn drop(&mut self) {
        self.zeroize();
    }
}

// 값은 절대 출력하지 않음
impl std::fmt::Debug for SecretPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretPayload")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// 시크릿 보관 모드 (호출자가 소유하는 상태)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageMode {
    /// 저장하지 않음 (매번 입력)
    None,
    /// 프로세스 메모리에만 보관
    Session,
    /// Envelope 파일로 디스크에 보관
    Disk,
}

/// save 옵션
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    pub mode: StorageMode,
    /// 시크릿 디렉토리가 다른 머신으로 통째로 복사될 수 있는 배포 형태
    pub portable: bool,
    /// DISK 저장 성공 시 비밀번호를 DiskKeyMaterial로 보관
    pub remember_password: bool,
}

impl SaveOptions {
    pub fn new(mode: StorageMode) -> Self {
        Self {
            mode,
            portable: false,
            remember_password: false,
        }
    }

    pub fn portable(mut self, portable: bool) -> Self {
        self.portable = portable;
        self
    }

    pub fn remember_password(mut self, remember: bool) -> Self {
        self.remember_password = remember;
        self
    }
}

/// load 시 호출자가 직접 제공하는 입력
#[derive(Debug, Clone, Copy)]
pub enum Credential<'a> {
    /// 사용자가 직접 입력한 시크릿 (캐시/디스크 미사용)
    Payload(&'a SecretPayload),
    /// 디스크 복호화에 사용할 비밀번호 (캐시 미사용)
    Password(&'a str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_json_is_flat_object() {
        let payload: SecretPayload = [("api_key", "sk-test"), ("secret_id", "AKID")]
            .into_iter()
            .collect();

        let json = payload.to_json().unwrap();
        assert_eq!(
            String::from_utf8(json.clone()).unwrap(),
            r#"{"api_key":"sk-test","secret_id":"AKID"}"#
        );
        assert_eq!(SecretPayload::from_json(&json).unwrap(), payload);
    }

    #[test]
    fn test_payload_debug_hides_values() {
        let mut payload = SecretPayload::new();
        payload.insert("api_key", "sk-very-secret");
        let printed = format!("{:?}", payload);
        assert!(printed.contains("api_key"));
        assert!(!printed.contains("sk-very-secret"));
    }

    #[test]
    fn test_storage_mode_serde_names() {
        assert_eq!(serde_json::to_string(&StorageMode::Disk).unwrap(), "\"DISK\"");
        let mode: StorageMode = serde_json::from_str("\"SESSION\"").unwrap();
        assert_eq!(mode, StorageMode::Session);
    }
}
