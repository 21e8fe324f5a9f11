//! File-backed progress and log channel.
//!
//! Single writer per run, many readers. `progress.json` is replaced
//! atomically so a polling reader always sees a consistent record;
//! `run.log` appends are serialized behind a per-run mutex.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use raybench_core::errors::{ErrorInfo, RbError};
use raybench_core::fsio::atomic_write_bytes;
use raybench_core::provenance::utc_timestamp_millis;
use raybench_core::serde::{from_json_slice, to_canonical_json_pretty};

use crate::layout::{PROGRESS_JSON, RUN_LOG};
use crate::types::{ProgressRecord, RunStatus};

/// Progress journal keyed by run id.
#[derive(Debug)]
pub struct ProgressJournal {
    root: PathBuf,
    run_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ProgressJournal {
    /// Creates a journal over the given run-store root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            run_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Applies a progress update with monotone clamping.
    ///
    /// Transitions never move backward: a terminal record latches and later
    /// updates are ignored; a stale `(step_index, progress)` pair saturates
    /// to the stored watermark. Returns the record actually persisted.
    pub fn update(&self, run_id: &str, record: &ProgressRecord) -> Result<ProgressRecord, RbError> {
        let lock = self.lock_for(run_id);
        let _guard = lock.lock().expect("journal lock poisoned");

        let path = self.progress_path(run_id);
        let current: Option<ProgressRecord> = match fs::read(&path) {
            Ok(bytes) => from_json_slice(&bytes).ok(),
            Err(_) => None,
        };

        let merged = match current {
            Some(current) if current.status.is_terminal() => current,
            Some(current) => merge(current, record.clone()),
            None => stamped(record.clone()),
        };

        let bytes = to_canonical_json_pretty(&merged)?;
        atomic_write_bytes(&path, &bytes)?;
        Ok(merged)
    }

    /// Returns the latest record without blocking writers.
    pub fn snapshot(&self, run_id: &str) -> Result<ProgressRecord, RbError> {
        let bytes = fs::read(self.progress_path(run_id)).map_err(|err| {
            RbError::NotFound(
                ErrorInfo::new("progress_missing", err.to_string()).with_context("run_id", run_id),
            )
        })?;
        from_json_slice(&bytes)
    }

    /// Appends a timestamped UTF-8 line to the run log.
    pub fn append_log(&self, run_id: &str, line: &str) -> Result<(), RbError> {
        let lock = self.lock_for(run_id);
        let _guard = lock.lock().expect("journal lock poisoned");

        let path = self.root.join(run_id).join(RUN_LOG);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| {
                RbError::Io(
                    ErrorInfo::new("log_open", err.to_string())
                        .with_context("path", path.display().to_string()),
                )
            })?;
        let line = line.trim_end_matches(['\r', '\n']);
        writeln!(file, "{} {}", utc_timestamp_millis(), line)
            .map_err(|err| RbError::Io(ErrorInfo::new("log_append", err.to_string())))
    }

    fn progress_path(&self, run_id: &str) -> PathBuf {
        self.root.join(run_id).join(PROGRESS_JSON)
    }

    fn lock_for(&self, run_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.run_locks.lock().expect("journal registry poisoned");
        locks
            .entry(run_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn stamped(mut record: ProgressRecord) -> ProgressRecord {
    record.updated_at = utc_timestamp_millis();
    if record.status != RunStatus::Failed {
        record.error = None;
    }
    record
}

fn merge(current: ProgressRecord, incoming: ProgressRecord) -> ProgressRecord {
    let mut next = incoming;

    // Status never moves backward.
    if next.status.rank() < current.status.rank() {
        next.status = current.status;
    }

    // (step_index, progress) saturates to the stored watermark.
    if next.step_index < current.step_index {
        next.step_index = current.step_index;
        next.step_name = current.step_name.clone();
    }
    next.progress = match (current.progress, next.progress) {
        (Some(old), Some(new)) => Some(old.max(new).clamp(0.0, 1.0)),
        (Some(old), None) => Some(old),
        (None, new) => new.map(|p| p.clamp(0.0, 1.0)),
    };
    if next.total_steps == 0 {
        next.total_steps = current.total_steps;
    }

    stamped(next)
}
