//! Directory tree synchronization.
//!
//! One-way passes make a destination mirror a source; two-way passes merge
//! both trees with last-write-wins and report same-instant edits as
//! conflicts. See [`sync::SyncEngine`].

pub mod bisync;
pub mod config;
pub mod error;
pub mod log;
pub mod server;
pub mod sync;

pub use bisync::ConflictRecord;
pub use error::{Result, SyncError};
pub use sync::context::{RunStatus, SyncContext};
pub use sync::{SyncEngine, SyncMode, SyncReport, SyncSession};
