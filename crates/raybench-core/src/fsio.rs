//! Atomic filesystem primitives.
//!
//! Artifacts are replaced whole-or-nothing: writes land in a sibling temp
//! file which is then renamed over the target, so concurrent readers never
//! observe a truncated document.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::errors::{ErrorInfo, RbError};

fn io_error(code: &str, path: &Path, err: impl ToString) -> RbError {
    RbError::Io(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

/// Creates a directory and all missing parents.
pub fn ensure_dir(path: &Path) -> Result<(), RbError> {
    fs::create_dir_all(path).map_err(|err| io_error("dir_create", path, err))
}

/// Writes bytes via write-to-temp then rename.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<(), RbError> {
    let parent = path
        .parent()
        .ok_or_else(|| io_error("tmp_parent", path, "path has no parent directory"))?;
    ensure_dir(parent)?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("artifact");
    let tmp = path.with_file_name(format!(
        ".{}.tmp.{}.{}",
        name,
        std::process::id(),
        chrono::Utc::now().timestamp_micros()
    ));
    let mut file = fs::File::create(&tmp).map_err(|err| io_error("tmp_create", &tmp, err))?;
    file.write_all(bytes)
        .map_err(|err| io_error("tmp_write", &tmp, err))?;
    file.sync_all()
        .map_err(|err| io_error("tmp_sync", &tmp, err))?;
    fs::rename(&tmp, path).map_err(|err| io_error("tmp_rename", path, err))?;
    if let Ok(dir) = fs::File::open(parent) {
        let _ = dir.sync_all();
    }
    Ok(())
}

/// Reads the full contents of a file.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>, RbError> {
    fs::read(path).map_err(|err| io_error("file_read", path, err))
}

/// Reads a UTF-8 file into a string.
pub fn read_string(path: &Path) -> Result<String, RbError> {
    fs::read_to_string(path).map_err(|err| io_error("file_read", path, err))
}
