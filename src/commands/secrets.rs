//! Secret Store 호스트 명령어
//!
//! 호스트 UI 레이어가 JSON 으로 호출하는 얇은 래퍼입니다.
//! - 인자로 받은 비밀번호/시크릿 문자열은 명령이 끝나면 zeroize
//! - 에러는 안정적인 코드(`CommandError.code`)로 변환

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{CommandError, CommandResult};
use crate::models::{Credential, SaveOptions, SecretPayload, StorageMode};
use crate::secrets::SecretStore;

/// 시크릿 저장 요청
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSecretsArgs {
    pub secrets: HashMap<String, String>,
    pub mode: StorageMode,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub portable: bool,
    #[serde(default)]
    pub remember_password: bool,
}

impl Drop for SaveSecretsArgs {
    fn drop(&mut self) {
        self.password.zeroize();
        for value in self.secrets.values_mut() {
            value.zeroize();
        }
    }
}

/// 시크릿 조회/검증 요청
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordArgs {
    #[serde(default)]
    pub password: Option<String>,
}

impl Drop for PasswordArgs {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

/// 저장소 상태 (시크릿 값은 포함하지 않음)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretsStatus {
    pub has_disk_secret: bool,
    pub has_session_secret: bool,
    pub has_remembered_password: bool,
    pub write_backend: String,
}

/// 복호화 검증 결과
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretsVerifyResult {
    pub success: bool,
    pub backend: String,
}

/// 시크릿 저장
///
/// 선택된 모드(NONE/SESSION/DISK)에 따라 보관합니다.
pub fn secrets_save(store: &SecretStore, mut args: SaveSecretsArgs) -> CommandResult<()> {
    let payload: SecretPayload = std::mem::take(&mut args.secrets).into_iter().collect();
    let options = SaveOptions::new(args.mode)
        .portable(args.portable)
        .remember_password(args.remember_password);

    store
        .save_with_options(args.password.as_deref(), &payload, options)
        .map_err(CommandError::from)
}

/// 시크릿 조회
///
/// 비밀번호가 주어지면 디스크에서 직접 복호화하고,
/// 없으면 세션 캐시 → 디스크 순으로 조회합니다.
pub fn secrets_load(store: &SecretStore, args: PasswordArgs) -> CommandResult<SecretPayload> {
    let explicit = args
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(Credential::Password);

    store.load(explicit).map_err(CommandError::from)
}

/// 저장된 시크릿 복호화 테스트
pub fn secrets_verify(store: &SecretStore, args: PasswordArgs) -> CommandResult<SecretsVerifyResult> {
    let backend = store
        .verify(args.password.as_deref())
        .map_err(CommandError::from)?;

    Ok(SecretsVerifyResult {
        success: true,
        backend: backend.to_string(),
    })
}

/// 세션 캐시 비우기 (호스트 종료 훅에서도 호출)
pub fn secrets_clear_session(store: &SecretStore) -> CommandResult<()> {
    store.clear_session();
    Ok(())
}

/// 디스크에 저장된 시크릿과 기억된 비밀번호 삭제
pub fn secrets_forget_disk(store: &SecretStore) -> CommandResult<()> {
    store.forget_disk_secret().map_err(CommandError::from)?;
    store.forget_password().map_err(CommandError::from)
}

/// 저장소 상태 조회
pub fn secrets_status(store: &SecretStore) -> CommandResult<SecretsStatus> {
    Ok(SecretsStatus {
        has_disk_secret: store.has_disk_secret(),
        has_session_secret: store.session().has_payload(),
        has_remembered_password: store.has_remembered_password(),
        write_backend: store.config().availability().preferred().to_string(),
    })
}
