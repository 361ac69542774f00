use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::macros::format_description;
use time::OffsetDateTime;

/// Errors raised while persisting configuration files. Any variant means the
/// target file was left as it was before the call (backups are copies, and
/// writes go through a temp path plus rename).
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to back up {path} to {backup}: {source}")]
    Backup {
        path: String,
        backup: String,
        source: std::io::Error,
    },
    #[error("failed to write temporary file {path}: {source}")]
    TempWrite {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to move {temp} into place at {path}: {source}")]
    Rename {
        temp: String,
        path: String,
        source: std::io::Error,
    },
}

/// Create a timestamped backup copy of `path` before it is overwritten.
///
/// Returns the backup path, or `None` when there is nothing to back up.
/// Backups accumulate (`<path>.backup.<stamp>`); they are never pruned.
pub fn backup_file(path: &Path) -> Result<Option<PathBuf>, PersistError> {
    if !path.exists() {
        return Ok(None);
    }

    let stamp_format = format_description!("[year][month][day]_[hour][minute][second]");
    let stamp = OffsetDateTime::now_utc()
        .format(&stamp_format)
        .unwrap_or_else(|_| "unknown".to_string());

    let mut backup = backup_candidate(path, &stamp, 0);
    // Two backups of the same file inside one second must not clobber each
    // other; disambiguate with a counter suffix.
    let mut counter = 1;
    while backup.exists() {
        backup = backup_candidate(path, &stamp, counter);
        counter += 1;
    }

    fs::copy(path, &backup).map_err(|source| PersistError::Backup {
        path: path.display().to_string(),
        backup: backup.display().to_string(),
        source,
    })?;
    Ok(Some(backup))
}

fn backup_candidate(path: &Path, stamp: &str, counter: u32) -> PathBuf {
    let mut backup = path.as_os_str().to_owned();
    if counter == 0 {
        backup.push(format!(".backup.{stamp}"));
    } else {
        backup.push(format!(".backup.{stamp}.{counter}"));
    }
    PathBuf::from(backup)
}

/// Write `contents` to `path` atomically: write a sibling temp file, then
/// rename it into place, so an interrupted run never leaves a half-written
/// configuration file.
pub fn atomic_write(path: &Path, contents: &str) -> Result<(), PersistError> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    fs::write(&temp, contents).map_err(|source| PersistError::TempWrite {
        path: temp.display().to_string(),
        source,
    })?;

    fs::rename(&temp, path).map_err(|source| PersistError::Rename {
        temp: temp.display().to_string(),
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{atomic_write, backup_file};

    #[test]
    fn backup_of_missing_file_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("interfaces");
        assert!(backup_file(&path).expect("backup").is_none());
    }

    #[test]
    fn backup_copies_prewrite_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("interfaces");
        fs::write(&path, "original content\n").expect("write");

        let backup = backup_file(&path).expect("backup").expect("backup path");
        assert!(backup
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("interfaces.backup."));
        assert_eq!(
            fs::read_to_string(&backup).expect("read backup"),
            "original content\n"
        );
        // Original untouched.
        assert_eq!(
            fs::read_to_string(&path).expect("read original"),
            "original content\n"
        );
    }

    #[test]
    fn atomic_write_replaces_content_and_removes_temp() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("dhcpcd.conf");
        fs::write(&path, "old\n").expect("write");

        atomic_write(&path, "new\n").expect("atomic write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "new\n");
        assert!(!dir.path().join("dhcpcd.conf.tmp").exists());
    }

    #[test]
    fn atomic_write_creates_file_when_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fresh.conf");
        atomic_write(&path, "content\n").expect("atomic write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "content\n");
    }
}
