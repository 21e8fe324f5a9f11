//! Run directory allocation and artifact access.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde_json::Value;

use raybench_core::errors::{ErrorInfo, RbError};
use raybench_core::fsio::{atomic_write_bytes, ensure_dir};
use raybench_core::runid::{is_run_id, RunIdGenerator};

use crate::layout::{
    RunPaths, DATA_DIR, JOB_JSON, PLOTS_DIR, PROGRESS_JSON, VIEWER_DIR, VIEWER_MANIFEST,
};
use crate::types::{ProgressRecord, RunKind, RunListEntry, RunStatus};

/// A freshly allocated run.
#[derive(Debug, Clone)]
pub struct Run {
    /// Run identifier, equal to the directory name.
    pub run_id: String,
    /// Job family of the run.
    pub kind: RunKind,
    /// Path helpers for the run directory.
    pub paths: RunPaths,
}

/// Owner of the `<root>/<run_id>/` artifact tree.
///
/// The store is the only component that creates run directories; everything
/// else reads through handles or writes through [`RunStore::write_atomic`].
/// Directories are never deleted.
#[derive(Debug)]
pub struct RunStore {
    root: PathBuf,
    ids: RunIdGenerator,
}

impl RunStore {
    /// Opens (and creates if needed) a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, RbError> {
        let root = root.into();
        ensure_dir(&root)?;
        Ok(Self {
            root,
            ids: RunIdGenerator::new(),
        })
    }

    /// Store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocates a fresh run id and creates the directory skeleton.
    ///
    /// Fails with `Collision` when the directory already exists; the caller
    /// retries with a new id.
    pub fn allocate(&self, kind: RunKind) -> Result<Run, RbError> {
        let run_id = self.ids.next_id();
        let dir = self.root.join(&run_id);
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(RbError::Collision(
                    ErrorInfo::new("run_dir_exists", "run directory already exists")
                        .with_context("run_id", run_id),
                ));
            }
            Err(err) => {
                return Err(RbError::Io(
                    ErrorInfo::new("run_dir_create", err.to_string())
                        .with_context("path", dir.display().to_string()),
                ));
            }
        }
        for sub in [DATA_DIR, PLOTS_DIR, VIEWER_DIR] {
            ensure_dir(&dir.join(sub))?;
        }
        Ok(Run {
            run_id,
            kind,
            paths: RunPaths::new(dir),
        })
    }

    /// Writes an artifact atomically under a run directory.
    pub fn write_atomic(&self, run_id: &str, rel_path: &str, bytes: &[u8]) -> Result<(), RbError> {
        let dir = self.run_dir_checked(run_id)?;
        let rel = sanitize_rel_path(rel_path)?;
        atomic_write_bytes(&dir.join(rel), bytes)
    }

    /// Opens an existing run for reading.
    pub fn open(&self, run_id: &str) -> Result<RunHandle, RbError> {
        let dir = self.run_dir_checked(run_id)?;
        if !dir.is_dir() {
            return Err(RbError::NotFound(
                ErrorInfo::new("run_missing", "run directory not found")
                    .with_context("run_id", run_id),
            ));
        }
        Ok(RunHandle {
            run_id: run_id.to_string(),
            paths: RunPaths::new(dir),
        })
    }

    /// Enumerates runs in reverse-chronological (reverse id) order.
    ///
    /// Partially initialized directories are reported with
    /// `status: initializing`; scratch directories (underscore prefix) and
    /// foreign directory names are skipped.
    pub fn list(&self, kinds: Option<&[RunKind]>) -> Result<Vec<RunListEntry>, RbError> {
        let mut ids: Vec<String> = match fs::read_dir(&self.root) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.path().is_dir())
                .filter_map(|entry| entry.file_name().into_string().ok())
                .filter(|name| !name.starts_with('_') && is_run_id(name))
                .collect(),
            Err(err) => {
                return Err(RbError::Io(
                    ErrorInfo::new("store_list", err.to_string())
                        .with_context("path", self.root.display().to_string()),
                ));
            }
        };
        ids.sort();
        ids.reverse();

        let mut entries = Vec::with_capacity(ids.len());
        for run_id in ids {
            let paths = RunPaths::new(self.root.join(&run_id));
            let summary = read_json_opt(&paths.summary());
            let kind = read_kind(&paths);
            if let Some(filter) = kinds {
                match kind {
                    Some(kind) if filter.contains(&kind) => {}
                    _ => continue,
                }
            }
            let status = derive_status(&paths, summary.is_some());
            entries.push(RunListEntry {
                run_id,
                kind,
                status,
                has_viewer: paths.join(VIEWER_MANIFEST).is_file(),
                summary,
            });
        }
        Ok(entries)
    }

    fn run_dir_checked(&self, run_id: &str) -> Result<PathBuf, RbError> {
        if !is_run_id(run_id) {
            return Err(RbError::NotFound(
                ErrorInfo::new("run_id_malformed", "not a run id").with_context("run_id", run_id),
            ));
        }
        Ok(self.root.join(run_id))
    }
}

/// Read-only handle over an existing run directory.
#[derive(Debug, Clone)]
pub struct RunHandle {
    /// Identifier of the run.
    pub run_id: String,
    /// Path helpers for the run directory.
    pub paths: RunPaths,
}

impl RunHandle {
    /// Reads a relative artifact, failing with `NotFound` when absent.
    pub fn read(&self, rel_path: &str) -> Result<Vec<u8>, RbError> {
        let rel = sanitize_rel_path(rel_path)?;
        let path = self.paths.join(&rel);
        fs::read(&path).map_err(|err| {
            RbError::NotFound(
                ErrorInfo::new("artifact_missing", err.to_string())
                    .with_context("run_id", self.run_id.clone())
                    .with_context("artifact", rel_path),
            )
        })
    }

    /// Reads and parses a JSON artifact.
    pub fn read_json(&self, rel_path: &str) -> Result<Value, RbError> {
        let bytes = self.read(rel_path)?;
        raybench_core::serde::from_json_slice(&bytes)
    }

    /// True when the relative artifact exists.
    pub fn exists(&self, rel_path: &str) -> bool {
        sanitize_rel_path(rel_path)
            .map(|rel| self.paths.join(&rel).exists())
            .unwrap_or(false)
    }
}

/// Rejects absolute paths and parent-directory components.
pub fn sanitize_rel_path(rel_path: &str) -> Result<String, RbError> {
    let path = Path::new(rel_path);
    if path.is_absolute() {
        return Err(RbError::NotFound(
            ErrorInfo::new("path_absolute", "artifact paths must be relative")
                .with_context("path", rel_path),
        ));
    }
    for component in path.components() {
        match component {
            Component::Normal(_) => {}
            Component::CurDir => {}
            _ => {
                return Err(RbError::NotFound(
                    ErrorInfo::new("path_escape", "artifact path escapes the run directory")
                        .with_context("path", rel_path),
                ));
            }
        }
    }
    Ok(rel_path.to_string())
}

fn read_json_opt(path: &Path) -> Option<Value> {
    let bytes = fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn read_kind(paths: &RunPaths) -> Option<RunKind> {
    let job = read_json_opt(&paths.join(JOB_JSON))?;
    match job.get("kind")?.as_str()? {
        "sim" => Some(RunKind::Sim),
        "ris" => Some(RunKind::Ris),
        _ => None,
    }
}

fn derive_status(paths: &RunPaths, has_summary: bool) -> RunStatus {
    if let Some(progress) = read_json_opt(&paths.join(PROGRESS_JSON)) {
        if let Ok(record) = serde_json::from_value::<ProgressRecord>(progress) {
            return record.status;
        }
    }
    if has_summary {
        RunStatus::Completed
    } else {
        RunStatus::Initializing
    }
}
