//! 소유자 전용 파일/디렉토리 헬퍼
//!
//! 모든 시크릿 파일은 mode 600, 디렉토리는 mode 700 으로 유지합니다.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::SecretError;

#[cfg(unix)]
const PRIVATE_FILE_MODE: u32 = 0o600;
#[cfg(unix)]
const PRIVATE_DIR_MODE: u32 = 0o700;

fn permission_error(path: &Path, source: std::io::Error) -> SecretError {
    SecretError::Permission {
        path: path.to_path_buf(),
        source,
    }
}

/// io::Error를 경로 정보와 함께 SecretError로 변환
pub(crate) fn map_io_error(path: &Path, err: std::io::Error) -> SecretError {
    match err.kind() {
        ErrorKind::NotFound => SecretError::FileNotFound(path.to_path_buf()),
        ErrorKind::PermissionDenied => permission_error(path, err),
        _ => SecretError::Io(err),
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), SecretError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| permission_error(path, e))
}

/// 디렉토리 생성 (부모 포함) 후 owner-only 권한 적용
pub fn ensure_private_dir(dir: &Path) -> Result<(), SecretError> {
    fs::create_dir_all(dir).map_err(|e| map_io_error(dir, e))?;

    #[cfg(unix)]
    set_mode(dir, PRIVATE_DIR_MODE)?;

    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn create_private_file(path: &Path) -> std::io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(PRIVATE_FILE_MODE);
    }

    options.open(path)
}

/// Atomic write: 같은 디렉토리의 임시 파일에 쓰고, 권한 설정 후 rename
///
/// 크래시가 나더라도 정식 경로에 반쯤 쓰인 파일이 남지 않습니다.
pub fn write_private_file(path: &Path, data: &[u8]) -> Result<(), SecretError> {
    if let Some(parent) = path.parent() {
        ensure_private_dir(parent)?;
    }

    let tmp_path = tmp_path_for(path);
    let result = write_then_rename(&tmp_path, path, data);
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_then_rename(tmp_path: &Path, path: &Path, data: &[u8]) -> Result<(), SecretError> {
    let mut file = create_private_file(tmp_path).map_err(|e| map_io_error(tmp_path, e))?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    // 기존 tmp 파일이 남아있던 경우 mode가 적용되지 않으므로 다시 지정
    #[cfg(unix)]
    set_mode(tmp_path, PRIVATE_FILE_MODE)?;

    fs::rename(tmp_path, path).map_err(|e| map_io_error(path, e))?;

    #[cfg(unix)]
    set_mode(path, PRIVATE_FILE_MODE)?;

    Ok(())
}

/// 파일 읽기 (없으면 FileNotFound)
pub fn read_private_file(path: &Path) -> Result<Vec<u8>, SecretError> {
    fs::read(path).map_err(|e| map_io_error(path, e))
}

/// 파일이 있으면 삭제 (idempotent)
pub fn remove_if_exists(path: &Path) -> Result<(), SecretError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(map_io_error(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("secret.enc");

        write_private_file(&path, b"hello").unwrap();

        assert_eq!(read_private_file(&path).unwrap(), b"hello");
        assert!(!tmp_path_for(&path).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_permissions_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let secret_dir = dir.path().join("cfg");
        let path = secret_dir.join("secret.enc");

        // 느슨한 권한으로 미리 만들어 둔 파일도 600으로 재설정되어야 함
        fs::create_dir_all(&secret_dir).unwrap();
        fs::write(&path, b"old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        write_private_file(&path, b"new").unwrap();

        let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        let dir_mode = fs::metadata(&secret_dir).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn test_missing_file_maps_to_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent");

        assert!(matches!(
            read_private_file(&path),
            Err(SecretError::FileNotFound(p)) if p == path
        ));
        remove_if_exists(&path).unwrap();
    }

    #[test]
    fn test_permission_denied_maps_to_permission_error() {
        let path = PathBuf::from("/var/lib/app/secret.enc");
        let err = map_io_error(&path, std::io::Error::from(ErrorKind::PermissionDenied));

        assert_eq!(err.code(), "PERMISSION_ERROR");
        assert!(matches!(
            err,
            SecretError::Permission { path: ref p, .. } if *p == path
        ));

        let other = map_io_error(&path, std::io::Error::from(ErrorKind::InvalidData));
        assert_eq!(other.code(), "IO_ERROR");
    }
}
