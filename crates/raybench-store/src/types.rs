//! Run and progress data types.

use serde::{Deserialize, Serialize};

/// Job family a run belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    /// Ray-trace simulation run.
    Sim,
    /// RIS Lab run.
    Ris,
}

/// Lifecycle status of a run.
///
/// `Initializing` never appears in `progress.json`; it is reported for run
/// directories discovered on disk before their first progress write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Directory exists but no progress has been recorded yet.
    Initializing,
    /// Waiting for a worker slot.
    Queued,
    /// Worker is executing.
    Running,
    /// Terminal: worker exited cleanly.
    Completed,
    /// Terminal: worker failed.
    Failed,
}

impl RunStatus {
    /// True for `Completed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    /// Rank used to forbid backward transitions.
    pub(crate) fn rank(self) -> u8 {
        match self {
            RunStatus::Initializing => 0,
            RunStatus::Queued => 1,
            RunStatus::Running => 2,
            RunStatus::Completed | RunStatus::Failed => 3,
        }
    }
}

/// The single current progress record of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Current lifecycle status.
    pub status: RunStatus,
    /// Index of the step being executed.
    #[serde(default)]
    pub step_index: u32,
    /// Human-readable name of the current step.
    #[serde(default)]
    pub step_name: String,
    /// Total number of steps for this run.
    #[serde(default)]
    pub total_steps: u32,
    /// Fractional completion in `[0, 1]` when known.
    #[serde(default)]
    pub progress: Option<f64>,
    /// Failure reason; set iff `status` is `failed`.
    #[serde(default)]
    pub error: Option<String>,
    /// Journal-assigned RFC-3339 timestamp of the last accepted update.
    #[serde(default)]
    pub updated_at: String,
}

impl ProgressRecord {
    /// A fresh `queued` record.
    pub fn queued() -> Self {
        Self {
            status: RunStatus::Queued,
            step_index: 0,
            step_name: String::new(),
            total_steps: 0,
            progress: Some(0.0),
            error: None,
            updated_at: String::new(),
        }
    }

    /// A `running` record positioned at the given step.
    pub fn running(step_index: u32, step_name: impl Into<String>, total_steps: u32) -> Self {
        let progress = if total_steps > 0 {
            Some((f64::from(step_index) / f64::from(total_steps)).min(1.0))
        } else {
            None
        };
        Self {
            status: RunStatus::Running,
            step_index,
            step_name: step_name.into(),
            total_steps,
            progress,
            error: None,
            updated_at: String::new(),
        }
    }

    /// A terminal `completed` record.
    pub fn completed(total_steps: u32) -> Self {
        Self {
            status: RunStatus::Completed,
            step_index: total_steps,
            step_name: "Complete".to_string(),
            total_steps,
            progress: Some(1.0),
            error: None,
            updated_at: String::new(),
        }
    }

    /// A terminal `failed` record carrying the failure reason.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed,
            step_index: 0,
            step_name: String::new(),
            total_steps: 0,
            progress: None,
            error: Some(error.into()),
            updated_at: String::new(),
        }
    }
}

/// Listing entry returned by `RunStore::list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunListEntry {
    /// Run identifier (directory name).
    pub run_id: String,
    /// Job family, when the run directory records it.
    pub kind: Option<RunKind>,
    /// Current status derived from on-disk state.
    pub status: RunStatus,
    /// Whether viewer artifacts exist for this run.
    pub has_viewer: bool,
    /// Parsed `summary.json`, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<serde_json::Value>,
}
