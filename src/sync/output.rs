use crate::bisync::Side;
use serde::Serialize;
use std::path::PathBuf;

use super::SyncMode;

/// JSON output mode for machine-readable sync events
/// Uses NDJSON format (newline-delimited JSON)
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    Start {
        source: PathBuf,
        destination: PathBuf,
        mode: SyncMode,
        total_paths: usize,
    },
    Copy {
        path: String,
        bytes_transferred: u64,
    },
    Delete {
        path: String,
    },
    Create {
        path: String,
        to: Side,
        bytes_transferred: u64,
    },
    Update {
        path: String,
        winner: Side,
        bytes_transferred: u64,
    },
    Conflict {
        path: String,
    },
    Error {
        error: String,
    },
    Summary {
        files_copied: usize,
        files_deleted: usize,
        files_created: usize,
        files_updated: usize,
        files_skipped: usize,
        conflicts: usize,
        bytes_transferred: u64,
        duration_secs: f64,
    },
}

impl SyncEvent {
    /// Emit this event as JSON to stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }
}
