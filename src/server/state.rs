//! Shared state for the control server

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::sync::{SyncEngine, SyncMode, SyncSession};

/// Roots picked by the client for the next run
#[derive(Debug, Clone)]
pub struct Roots {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl Default for Roots {
    fn default() -> Self {
        Self {
            source: PathBuf::from("/"),
            destination: PathBuf::from("/"),
        }
    }
}

pub struct AppState {
    pub engine: SyncEngine,
    roots: Mutex<Roots>,
}

impl AppState {
    pub fn new(engine: SyncEngine) -> Self {
        Self::with_roots(engine, Roots::default())
    }

    pub fn with_roots(engine: SyncEngine, roots: Roots) -> Self {
        Self {
            engine,
            roots: Mutex::new(roots),
        }
    }

    pub fn roots(&self) -> Roots {
        self.lock_roots().clone()
    }

    pub fn set_source(&self, path: PathBuf) {
        self.lock_roots().source = path;
    }

    pub fn set_destination(&self, path: PathBuf) {
        self.lock_roots().destination = path;
    }

    /// Session for the currently selected roots
    pub fn session(&self, mode: SyncMode) -> SyncSession {
        let roots = self.lock_roots();
        SyncSession::new(roots.source.clone(), roots.destination.clone(), mode)
    }

    fn lock_roots(&self) -> MutexGuard<'_, Roots> {
        self.roots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
