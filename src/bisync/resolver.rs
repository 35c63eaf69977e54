use crate::sync::scanner::FileRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Which side of the sync (source or destination)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Source,
    Dest,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Source => Side::Dest,
            Side::Dest => Side::Source,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Source => "source",
            Side::Dest => "dest",
        }
    }
}

/// Outcome for a path that differs on both sides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Copy this side over the other
    Wins(Side),
    /// No recency order; leave both sides alone
    Conflict,
}

/// A path whose two sides could not be ordered by mtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub path: String,
}

impl ConflictRecord {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Last-write-wins by mtime. Equal mtimes have no tie-break and are
/// reported as a conflict.
pub fn resolve(source: &FileRecord, dest: &FileRecord) -> Resolution {
    match source.modified.cmp(&dest.modified) {
        Ordering::Greater => Resolution::Wins(Side::Source),
        Ordering::Less => Resolution::Wins(Side::Dest),
        Ordering::Equal => Resolution::Conflict,
    }
}
