//! Worker stdout progress protocol.
//!
//! A worker line starting with `PROGRESS ` carries a compact JSON progress
//! record; everything else is opaque log. The scheduler's line capturer is
//! the only component that interprets worker output.

use raybench_store::ProgressRecord;

/// Prefix marking a structured progress line.
pub const PROGRESS_PREFIX: &str = "PROGRESS ";

/// Parses a captured line; `None` when it is not a progress line or the
/// payload does not deserialize (such lines stay in the log verbatim).
pub fn parse_progress_line(line: &str) -> Option<ProgressRecord> {
    let payload = line.strip_prefix(PROGRESS_PREFIX)?;
    serde_json::from_str(payload.trim()).ok()
}

/// Formats a record as a protocol line (no trailing newline).
pub fn format_progress_line(record: &ProgressRecord) -> String {
    let payload = serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string());
    format!("{PROGRESS_PREFIX}{payload}")
}
