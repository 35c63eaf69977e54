use crate::bisync::ConflictRecord;
use crate::error::{Result, SyncError};
use crate::log::{LogSink, MemoryLog};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Externally visible state of the sync runs on a context
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Done,
    Error(String),
}

impl RunStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, RunStatus::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Idle => write!(f, "idle"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Done => write!(f, "done"),
            RunStatus::Error(message) => write!(f, "error: {}", message),
        }
    }
}

pub type ConflictCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct RunState {
    status: RunStatus,
    conflicts: Vec<ConflictRecord>,
}

/// State shared between the engine and the shell driving it.
///
/// Status and conflicts change only under one lock, so starting a run is a
/// single check-and-set: at most one run is `Running` per context.
pub struct SyncContext {
    state: Mutex<RunState>,
    callback: RwLock<Option<ConflictCallback>>,
    log: Arc<dyn LogSink>,
}

impl SyncContext {
    pub fn new(log: Arc<dyn LogSink>) -> Self {
        Self {
            state: Mutex::new(RunState::default()),
            callback: RwLock::new(None),
            log,
        }
    }

    /// Context that keeps its run log in memory
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryLog::new()))
    }

    pub fn status(&self) -> RunStatus {
        self.lock_state().status.clone()
    }

    /// Conflicts recorded by the current or most recent run
    pub fn conflicts(&self) -> Vec<ConflictRecord> {
        self.lock_state().conflicts.clone()
    }

    pub fn log(&self) -> &dyn LogSink {
        self.log.as_ref()
    }

    /// Register the conflict handler, replacing any previous one
    pub fn set_conflict_callback<F>(&self, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let handler: ConflictCallback = Arc::new(handler);
        *self
            .callback
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    pub fn clear_conflict_callback(&self) {
        *self
            .callback
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Move to `Running` unless a run is already in progress.
    ///
    /// Clears the conflict list of the previous run.
    pub fn begin(self: &Arc<Self>) -> Result<RunPermit> {
        let mut state = self.lock_state();
        if state.status.is_running() {
            return Err(SyncError::AlreadyRunning);
        }
        state.status = RunStatus::Running;
        state.conflicts.clear();
        drop(state);

        Ok(RunPermit {
            context: Arc::clone(self),
            finished: false,
        })
    }

    /// Store a conflict and notify the handler synchronously
    pub(crate) fn record_conflict(&self, record: ConflictRecord) {
        let path = record.path.clone();
        self.lock_state().conflicts.push(record);

        // Clone the handler out so it runs without holding any lock
        let handler = self
            .callback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handler) = handler {
            handler(&path);
        }
    }

    fn set_status(&self, status: RunStatus) {
        self.lock_state().status = status;
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncContext")
            .field("status", &self.status())
            .field("conflicts", &self.conflicts().len())
            .finish()
    }
}

/// Proof that a run owns the context's `Running` state.
///
/// Dropping an unfinished permit (a panicking run) leaves the context in
/// `Error` so it never stays stuck in `Running`.
#[derive(Debug)]
pub struct RunPermit {
    context: Arc<SyncContext>,
    finished: bool,
}

impl RunPermit {
    pub fn context(&self) -> &Arc<SyncContext> {
        &self.context
    }

    pub(crate) fn complete(mut self, status: RunStatus) {
        self.finished = true;
        self.context.set_status(status);
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        if !self.finished {
            self.context
                .set_status(RunStatus::Error("sync run ended unexpectedly".to_string()));
        }
    }
}
