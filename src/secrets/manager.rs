//! Secret Store - 저장 모드별 보관 및 시크릿 조회
//!
//! - NONE: 저장하지 않음 (매번 입력)
//! - SESSION: 세션 캐시에만 보관
//! - DISK: 비밀번호로 암호화한 envelope 파일 (mode 600)
//!
//! 조회 순서는 고정입니다: 호출자 직접 입력 → 세션 캐시 → 디스크.
//! 내부 잠금은 없으며, 호스트가 save/load 호출을 직렬화한다고 가정합니다.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::error::SecretError;
use crate::models::{Credential, SaveOptions, SecretPayload, StorageMode};
use crate::secrets::cipher::{Backend, BackendAvailability};
use crate::secrets::key_material::DiskKeyMaterial;
use crate::secrets::kdf::KdfProfile;
use crate::secrets::session::SessionCache;
use crate::secrets::vault::{encrypt_and_write, get_secret_path, open_envelope, read_envelope};
use crate::utils::remove_if_exists;

/// 저장소 설정
#[derive(Debug, Clone)]
pub struct StoreConfig {
    dir: PathBuf,
    kdf: KdfProfile,
    availability: BackendAvailability,
}

impl StoreConfig {
    /// 설치별 시크릿 디렉토리 (예: 호스트의 app data dir)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            kdf: KdfProfile::default(),
            availability: BackendAvailability::detect(),
        }
    }

    pub fn with_kdf(mut self, kdf: KdfProfile) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn with_availability(mut self, availability: BackendAvailability) -> Self {
        self.availability = availability;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn secret_path(&self) -> PathBuf {
        get_secret_path(&self.dir)
    }

    pub fn kdf(&self) -> &KdfProfile {
        &self.kdf
    }

    pub fn availability(&self) -> &BackendAvailability {
        &self.availability
    }
}

/// Secret Store
///
/// envelope 파일의 유일한 writer 이며, 세션 캐시는 주입받아 사용합니다.
#[derive(Debug)]
pub struct SecretStore {
    config: StoreConfig,
    session: Arc<SessionCache>,
    key_material: DiskKeyMaterial,
}

impl SecretStore {
    /// 독립된 세션 캐시로 생성
    pub fn new(config: StoreConfig) -> Self {
        Self::with_session(config, Arc::new(SessionCache::new()))
    }

    /// 세션 캐시를 공유하여 생성 (예: `SessionCache::global()`)
    pub fn with_session(config: StoreConfig, session: Arc<SessionCache>) -> Self {
        let key_material = DiskKeyMaterial::in_dir(config.dir());
        Self {
            config,
            session,
            key_material,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionCache {
        &self.session
    }

    /// 시크릿 저장
    ///
    /// 호출 직후 UI 가 들고 있던 비밀번호 문자열은 호출자가 지워야 합니다.
    pub fn save(
        &self,
        password: Option<&str>,
        payload: &SecretPayload,
        mode: StorageMode,
        portable: bool,
    ) -> Result<(), SecretError> {
        self.save_with_options(password, payload, SaveOptions::new(mode).portable(portable))
    }

    pub fn save_with_options(
        &self,
        password: Option<&str>,
        payload: &SecretPayload,
        options: SaveOptions,
    ) -> Result<(), SecretError> {
        match options.mode {
            StorageMode::None => {
                debug!("NONE mode, secret is not persisted");
                Ok(())
            }
            StorageMode::Session => {
                self.session.set(payload.clone());
                // 비밀번호 없이 저장하면 이전 저장에서 남은 세션 비밀번호를 버림
                match password.filter(|p| !p.is_empty()) {
                    Some(password) => self.session.set_password(password),
                    None => self.session.clear_password(),
                }
                Ok(())
            }
            StorageMode::Disk => self.save_to_disk(password, payload, options),
        }
    }

    fn save_to_disk(
        &self,
        password: Option<&str>,
        payload: &SecretPayload,
        options: SaveOptions,
    ) -> Result<(), SecretError> {
        // 복사된 디렉토리에서는 키 파일이 의미가 없으므로 아무것도 쓰지 않음
        if options.portable {
            warn!("disk storage refused in portable mode");
            return Err(SecretError::PortableModeUnsupported);
        }

        let password = self
            .resolve_password(password)?
            .ok_or(SecretError::PasswordRequired)?;

        // 세션은 디스크 쪽 단계가 모두 성공한 뒤에만 갱신
        if options.remember_password {
            self.key_material.store(&password)?;
        } else {
            self.key_material.remove()?;
        }

        let backend = encrypt_and_write(
            &self.config.secret_path(),
            password.as_bytes(),
            payload,
            &self.config.kdf,
            &self.config.availability,
        )?;

        self.session.set(payload.clone());
        self.session.set_password(&password);

        info!(%backend, remember_password = options.remember_password, "secret saved to disk");
        Ok(())
    }

    /// 시크릿 조회
    ///
    /// 1. 호출자가 직접 준 페이로드/비밀번호 (캐시 미사용, 실패 시 그대로 반환)
    /// 2. 세션 캐시
    /// 3. 디스크 (세션 비밀번호 → 기억된 비밀번호 순으로 사용)
    pub fn load(&self, explicit: Option<Credential<'_>>) -> Result<SecretPayload, SecretError> {
        match explicit {
            Some(Credential::Payload(payload)) => Ok(payload.clone()),
            Some(Credential::Password(password)) => {
                let envelope = read_envelope(&self.config.secret_path())?;
                open_envelope(
                    password.as_bytes(),
                    &envelope,
                    &self.config.kdf,
                    &self.config.availability,
                )
            }
            None => {
                if let Some(payload) = self.session.get() {
                    debug!("secret resolved from session cache");
                    return Ok(payload);
                }
                let (payload, _) = self.open_disk(None)?;
                info!("secret resolved from disk");
                Ok(payload)
            }
        }
    }

    /// 비밀번호를 직접 입력한 조회
    pub fn load_with_password(&self, password: &str) -> Result<SecretPayload, SecretError> {
        self.load(Some(Credential::Password(password)))
    }

    /// 디스크 시크릿이 복호화되는지 확인 (세션 캐시의 페이로드는 사용하지 않음)
    pub fn verify(&self, password: Option<&str>) -> Result<Backend, SecretError> {
        let (_payload, backend) = self.open_disk(password)?;
        Ok(backend)
    }

    fn open_disk(&self, password: Option<&str>) -> Result<(SecretPayload, Backend), SecretError> {
        let envelope = read_envelope(&self.config.secret_path())?;
        let password = self
            .resolve_password(password)?
            .ok_or(SecretError::PasswordRequired)?;

        let payload = open_envelope(
            password.as_bytes(),
            &envelope,
            &self.config.kdf,
            &self.config.availability,
        )?;
        Ok((payload, envelope.backend))
    }

    /// 입력 비밀번호 → 세션 비밀번호 → 기억된 비밀번호
    fn resolve_password(
        &self,
        explicit: Option<&str>,
    ) -> Result<Option<Zeroizing<String>>, SecretError> {
        if let Some(password) = explicit.filter(|p| !p.is_empty()) {
            return Ok(Some(Zeroizing::new(password.to_owned())));
        }
        if let Some(password) = self.session.password() {
            return Ok(Some(password));
        }
        self.key_material.load()
    }

    /// 세션 캐시 비우기 (idempotent)
    pub fn clear_session(&self) {
        self.session.clear();
    }

    pub fn has_disk_secret(&self) -> bool {
        self.config.secret_path().exists()
    }

    pub fn has_remembered_password(&self) -> bool {
        self.key_material.exists()
    }

    /// envelope 파일 삭제
    pub fn forget_disk_secret(&self) -> Result<(), SecretError> {
        remove_if_exists(&self.config.secret_path())?;
        info!("encrypted secret removed from disk");
        Ok(())
    }

    /// 기억된 비밀번호 삭제
    pub fn forget_password(&self) -> Result<(), SecretError> {
        self.key_material.remove()
    }
}
