//! Canonical run-directory layout.

use std::path::{Path, PathBuf};

/// YAML form of the accepted config.
pub const CONFIG_YAML: &str = "config.yaml";
/// Canonical JSON form of the accepted config (the hashed bytes).
pub const CONFIG_JSON: &str = "config.json";
/// Lowercase hex SHA-256 of `config.json`.
pub const CONFIG_HASH: &str = "config_hash";
/// Captured worker output.
pub const RUN_LOG: &str = "run.log";
/// Current progress record.
pub const PROGRESS_JSON: &str = "progress.json";
/// Run summary written at completion.
pub const SUMMARY_JSON: &str = "summary.json";
/// RIS metrics (pattern or validation figures).
pub const METRICS_JSON: &str = "metrics.json";
/// Scheduler job record.
pub const JOB_JSON: &str = "job.json";
/// Binary arrays.
pub const DATA_DIR: &str = "data";
/// Rendered plots.
pub const PLOTS_DIR: &str = "plots";
/// Browser viewer blobs.
pub const VIEWER_DIR: &str = "viewer";
/// Viewer scene manifest, used as the `has_viewer` probe.
pub const VIEWER_MANIFEST: &str = "viewer/scene_manifest.json";

/// Path helpers for a single run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    dir: PathBuf,
}

impl RunPaths {
    /// Wraps an existing run directory path.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The run directory itself.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolves a relative artifact path inside the run directory.
    pub fn join(&self, rel: &str) -> PathBuf {
        self.dir.join(rel)
    }

    /// `progress.json` path.
    pub fn progress(&self) -> PathBuf {
        self.dir.join(PROGRESS_JSON)
    }

    /// `run.log` path.
    pub fn run_log(&self) -> PathBuf {
        self.dir.join(RUN_LOG)
    }

    /// `summary.json` path.
    pub fn summary(&self) -> PathBuf {
        self.dir.join(SUMMARY_JSON)
    }

    /// `data/` directory.
    pub fn data_dir(&self) -> PathBuf {
        self.dir.join(DATA_DIR)
    }

    /// `plots/` directory.
    pub fn plots_dir(&self) -> PathBuf {
        self.dir.join(PLOTS_DIR)
    }

    /// `viewer/` directory.
    pub fn viewer_dir(&self) -> PathBuf {
        self.dir.join(VIEWER_DIR)
    }
}
