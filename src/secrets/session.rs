//! 세션 캐시 - 프로세스 수명 동안 유지되는 단일 슬롯
//!
//! 페이로드와 비밀번호를 메모리에만 보관합니다. 직렬화되지 않으며,
//! `clear()` 또는 drop 시 값이 zeroize 됩니다.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;
use tracing::info;
use zeroize::Zeroizing;

use crate::models::SecretPayload;

/// 프로세스 전역 세션 캐시 (호스트가 공유하고 싶을 때 사용)
static GLOBAL_SESSION: Lazy<Arc<SessionCache>> = Lazy::new(|| Arc::new(SessionCache::new()));

#[derive(Default)]
struct SessionEntry {
    payload: Option<SecretPayload>,
    password: Option<Zeroizing<String>>,
}

/// 세션 캐시
#[derive(Default)]
pub struct SessionCache {
    slot: Mutex<SessionEntry>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 프로세스 전역 인스턴스
    pub fn global() -> Arc<SessionCache> {
        Arc::clone(&GLOBAL_SESSION)
    }

    fn entry(&self) -> MutexGuard<'_, SessionEntry> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 페이로드 저장 (기존 값 덮어쓰기)
    pub fn set(&self, payload: SecretPayload) {
        self.entry().payload = Some(payload);
        info!("session secret stored in memory");
    }

    pub fn get(&self) -> Option<SecretPayload> {
        self.entry().payload.clone()
    }

    pub fn set_password(&self, password: &str) {
        self.entry().password = Some(Zeroizing::new(password.to_owned()));
        info!("session password stored in memory");
    }

    /// 비밀번호만 비우기 (페이로드 유지)
    pub fn clear_password(&self) {
        if self.entry().password.take().is_some() {
            info!("session password cleared");
        }
    }

    pub fn password(&self) -> Option<Zeroizing<String>> {
        self.entry()
            .password
            .as_ref()
            .map(|p| Zeroizing::new(p.as_str().to_owned()))
    }

    pub fn has_payload(&self) -> bool {
        self.entry().payload.is_some()
    }

    pub fn is_empty(&self) -> bool {
        let entry = self.entry();
        entry.payload.is_none() && entry.password.is_none()
    }

    /// 슬롯 비우기 (비어 있어도 no-op)
    pub fn clear(&self) {
        let mut entry = self.entry();
        if entry.payload.is_none() && entry.password.is_none() {
            return;
        }
        // 이전 값은 drop 되면서 zeroize
        *entry = SessionEntry::default();
        info!("session cache cleared");
    }
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entry = self.entry();
        f.debug_struct("SessionCache")
            .field("has_payload", &entry.payload.is_some())
            .field("has_password", &entry.password.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: &str) -> SecretPayload {
        [("api_key", value)].into_iter().collect()
    }

    #[test]
    fn test_set_overwrites_and_clear_empties() {
        let cache = SessionCache::new();
        assert!(cache.get().is_none());

        cache.set(payload("one"));
        cache.set(payload("two"));
        assert_eq!(cache.get().unwrap().get("api_key"), Some("two"));

        cache.set_password("pw");
        assert_eq!(cache.password().unwrap().as_str(), "pw");

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get().is_none());
        assert!(cache.password().is_none());
    }

    #[test]
    fn test_clear_password_keeps_payload() {
        let cache = SessionCache::new();
        cache.set(payload("kept"));
        cache.set_password("pw");

        cache.clear_password();
        assert!(cache.password().is_none());
        assert_eq!(cache.get().unwrap().get("api_key"), Some("kept"));
    }

    #[test]
    fn test_clear_on_empty_is_noop() {
        let cache = SessionCache::new();
        cache.clear();
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_instances_are_independent() {
        let a = SessionCache::new();
        let b = SessionCache::new();
        a.set(payload("a"));
        assert!(b.get().is_none());
    }

    #[test]
    fn test_global_is_shared() {
        let first = SessionCache::global();
        let second = SessionCache::global();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_debug_hides_contents() {
        let cache = SessionCache::new();
        cache.set_password("hunter2");
        let printed = format!("{:?}", cache);
        assert!(!printed.contains("hunter2"));
    }
}
