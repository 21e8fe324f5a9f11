#![doc = "Run artifact tree ownership and the file-backed progress journal: directory allocation with collision surfacing, atomic artifact replacement, reverse-chronological discovery, and monotone progress/log streaming."]

pub mod journal;
pub mod layout;
pub mod runstore;
pub mod types;

pub use journal::ProgressJournal;
pub use layout::RunPaths;
pub use runstore::{sanitize_rel_path, Run, RunHandle, RunStore};
pub use types::{ProgressRecord, RunKind, RunListEntry, RunStatus};
