use crate::error::{PwdbError, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// `<path>-<YYYYmmddHHMMSS>`
pub fn backup_path(path: &Path, now: DateTime<Utc>) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!("-{}", now.format(BACKUP_TIMESTAMP_FORMAT)));
    PathBuf::from(name)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Replaces `path` with `contents`.
///
/// The data goes to a temp file next to the target first. An existing target
/// is renamed to its backup name, then the temp file is renamed over it.
/// Returns the backup path when one was made.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<Option<PathBuf>> {
    let file_name = path.file_name().ok_or_else(|| {
        PwdbError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{}' is not a file path", path.display()),
        ))
    })?;
    let tmp_file = parent_dir(path).join(format!(
        ".{}-{}.tmp",
        file_name.to_string_lossy(),
        Uuid::new_v4()
    ));
    replace_via(path, contents, &tmp_file, Utc::now())
}

fn replace_via(
    path: &Path,
    contents: &[u8],
    tmp_file: &Path,
    now: DateTime<Utc>,
) -> Result<Option<PathBuf>> {
    if let Err(e) = fs::write(tmp_file, contents) {
        let _ = fs::remove_file(tmp_file);
        return Err(PwdbError::Io(e));
    }

    let backup = if path.exists() {
        let backup = backup_path(path, now);
        if let Err(e) = fs::rename(path, &backup) {
            let _ = fs::remove_file(tmp_file);
            return Err(PwdbError::Io(e));
        }
        Some(backup)
    } else {
        None
    };

    if let Err(e) = fs::rename(tmp_file, path) {
        if let Some(backup) = &backup {
            let _ = fs::rename(backup, path);
        }
        let _ = fs::remove_file(tmp_file);
        return Err(PwdbError::Io(e));
    }

    Ok(backup)
}
