//! Safe run-file resolution.

use std::path::{Path, PathBuf};

use raybench_core::errors::{ErrorInfo, RbError};
use raybench_store::sanitize_rel_path;

/// Resolves a relative path inside `root`, rejecting traversal and symlink
/// escape.
///
/// The target must exist: both the root and the target are canonicalized
/// and the target must stay under the canonical root, so a symlink pointing
/// outside the run directory cannot leak files.
pub fn safe_resolve(root: &Path, rel_path: &str) -> Result<PathBuf, RbError> {
    let rel = sanitize_rel_path(rel_path)?;
    let canonical_root = root.canonicalize().map_err(|err| {
        RbError::NotFound(
            ErrorInfo::new("root_missing", err.to_string())
                .with_context("path", root.display().to_string()),
        )
    })?;
    let target = canonical_root.join(rel);
    let canonical_target = target.canonicalize().map_err(|err| {
        RbError::NotFound(
            ErrorInfo::new("file_missing", err.to_string())
                .with_context("path", rel_path),
        )
    })?;
    if !canonical_target.starts_with(&canonical_root) {
        return Err(RbError::NotFound(
            ErrorInfo::new("path_escape", "path resolves outside the run directory")
                .with_context("path", rel_path),
        ));
    }
    if !canonical_target.is_file() {
        return Err(RbError::NotFound(
            ErrorInfo::new("not_a_file", "path is not a regular file").with_context("path", rel_path),
        ));
    }
    Ok(canonical_target)
}
