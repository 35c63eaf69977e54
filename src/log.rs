//! User-facing run log.
//!
//! Separate from `tracing` diagnostics: this is the append-only record of
//! what a sync run did, which shells display or serve back to clients.

use chrono::{DateTime, Local, SecondsFormat};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogLine {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

impl LogLine {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, false),
            self.level,
            self.message
        )
    }
}

/// Append-only, thread-safe destination for run log lines
pub trait LogSink: Send + Sync {
    fn append(&self, line: LogLine);

    /// Everything logged so far, one line per entry
    fn contents(&self) -> String;

    fn info(&self, message: &str) {
        self.append(LogLine::new(LogLevel::Info, message));
    }

    fn error(&self, message: &str) {
        self.append(LogLine::new(LogLevel::Error, message));
    }
}

/// Keeps the log in memory
#[derive(Debug, Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<LogLine>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<LogLine> {
        lock(&self.lines).clone()
    }

    /// Messages without timestamps or levels
    pub fn messages(&self) -> Vec<String> {
        lock(&self.lines).iter().map(|l| l.message.clone()).collect()
    }
}

impl LogSink for MemoryLog {
    fn append(&self, line: LogLine) {
        lock(&self.lines).push(line);
    }

    fn contents(&self) -> String {
        lock(&self.lines)
            .iter()
            .map(|l| format!("{}\n", l))
            .collect()
    }
}

/// Appends to a log file (`sync.log` for the server)
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileLog {
    fn append(&self, line: LogLine) {
        let _guard = lock(&self.guard);
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{}", line));

        if let Err(e) = result {
            tracing::warn!("Failed to write log file {}: {}", self.path.display(), e);
        }
    }

    fn contents(&self) -> String {
        let _guard = lock(&self.guard);
        match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                tracing::warn!("Failed to read log file {}: {}", self.path.display(), e);
                String::new()
            }
        }
    }
}

/// A poisoned log lock still guards valid data; keep logging.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
