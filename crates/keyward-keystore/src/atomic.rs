//! Crash-safe file replacement.
//!
//! Every durable file of the node is written the same way:
//! write tmp → fsync → rename. A reader therefore sees either the old
//! contents or the new contents, never a torn file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use keyward_types::{KeywardError, Result};

/// Atomically replaces `path` with `bytes`.
///
/// With `private = true` the file is created with mode `0600` on Unix,
/// for files that hold key material.
///
/// If any step fails the original file is untouched.
pub fn write_atomic(path: &Path, bytes: &[u8], private: bool) -> Result<()> {
    let tmp_path = tmp_path(path)?;

    {
        let mut file = create_file(&tmp_path, private).map_err(|e| KeywardError::StorageError {
            reason: format!("failed to create {}: {e}", tmp_path.display()),
        })?;

        file.write_all(bytes)
            .map_err(|e| KeywardError::StorageError {
                reason: format!("failed to write {}: {e}", tmp_path.display()),
            })?;

        file.sync_all().map_err(|e| KeywardError::StorageError {
            reason: format!("failed to fsync {}: {e}", tmp_path.display()),
        })?;
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        KeywardError::StorageError {
            reason: format!("failed to rename onto {}: {e}", path.display()),
        }
    })
}

/// Removes `path`. A missing file is not an error.
pub fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(KeywardError::StorageError {
            reason: format!("failed to remove {}: {e}", path.display()),
        }),
    }
}

/// Creates `dir` and its parents if missing.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| KeywardError::StorageError {
        reason: format!("failed to create directory {}: {e}", dir.display()),
    })
}

/// Temporary sibling of `path`: `<dir>/.<name>.tmp`.
fn tmp_path(path: &Path) -> Result<PathBuf> {
    let parent = path.parent().ok_or_else(|| KeywardError::StorageError {
        reason: format!("{} has no parent directory", path.display()),
    })?;

    if !parent.as_os_str().is_empty() {
        ensure_dir(parent)?;
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| KeywardError::StorageError {
            reason: format!("{} has no valid file name", path.display()),
        })?;

    Ok(parent.join(format!(".{file_name}.tmp")))
}

#[cfg(unix)]
fn create_file(path: &Path, private: bool) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    if private {
        options.mode(0o600);
    }
    options.open(path)
}

#[cfg(not(unix))]
fn create_file(path: &Path, _private: bool) -> std::io::Result<fs::File> {
    fs::File::create(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "keyward_atomic_{name}_{}",
            std::process::id()
        ))
    }

    #[test]
    fn write_then_overwrite() -> std::result::Result<(), KeywardError> {
        let dir = scratch("overwrite");
        let path = dir.join("file.bin");

        write_atomic(&path, b"first", false)?;
        write_atomic(&path, b"second", false)?;

        let read = fs::read(&path).map_err(|e| KeywardError::StorageError {
            reason: e.to_string(),
        })?;
        assert_eq!(read, b"second");
        assert!(!dir.join(".file.bin.tmp").exists());

        let _ = fs::remove_dir_all(&dir);
        Ok(())
    }

    #[test]
    fn remove_missing_is_ok() {
        assert!(remove_if_exists(&scratch("never-created")).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn private_file_has_owner_only_mode() -> std::result::Result<(), KeywardError> {
        use std::os::unix::fs::PermissionsExt;

        let dir = scratch("private");
        let path = dir.join("secret.bin");
        write_atomic(&path, &[0u8; 32], true)?;

        let mode = fs::metadata(&path)
            .map_err(|e| KeywardError::StorageError {
                reason: e.to_string(),
            })?
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);

        let _ = fs::remove_dir_all(&dir);
        Ok(())
    }
}
