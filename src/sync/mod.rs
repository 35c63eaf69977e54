pub mod checksum;
pub mod context;
pub mod output;
pub mod scanner;
pub mod strategy;
pub mod transfer;

use crate::bisync::{self, ConflictRecord, Resolution, Side};
use crate::error::{Result, SyncError};
use context::{RunPermit, RunStatus, SyncContext};
use indicatif::{ProgressBar, ProgressStyle};
use output::SyncEvent;
use scanner::DirectorySnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use strategy::{Category, Classified, Comparison, SyncAction};
use transfer::{Obstruction, Propagator};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Destination mirrors source, including deletions
    OneWay,
    /// Both sides converge; newer mtime wins
    #[default]
    TwoWay,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::OneWay => write!(f, "one-way"),
            SyncMode::TwoWay => write!(f, "two-way"),
        }
    }
}

/// Roots and mode for a single pass
#[derive(Debug, Clone)]
pub struct SyncSession {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub mode: SyncMode,
}

impl SyncSession {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>, mode: SyncMode) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            mode,
        }
    }

    /// Both roots must be existing directories
    pub fn validate(&self) -> Result<()> {
        for root in [&self.source, &self.destination] {
            if !root.is_dir() {
                return Err(SyncError::InvalidRoot { path: root.clone() });
            }
        }
        Ok(())
    }
}

/// A filesystem change made during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedAction {
    /// One-way copy source → destination
    Copy { path: String, bytes: u64 },
    /// One-way removal from the destination
    Delete { path: String },
    /// Two-way: file existed on one side only and was created on `to`
    Create { path: String, to: Side, bytes: u64 },
    /// Two-way: the newer side overwrote the other
    Update { path: String, winner: Side, bytes: u64 },
}

impl AppliedAction {
    pub fn path(&self) -> &str {
        match self {
            AppliedAction::Copy { path, .. }
            | AppliedAction::Delete { path }
            | AppliedAction::Create { path, .. }
            | AppliedAction::Update { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    pub source_files: usize,
    pub destination_files: usize,
    pub files_copied: usize,
    pub files_deleted: usize,
    pub files_created: usize,
    pub files_updated: usize,
    pub files_skipped: usize,
    pub bytes_transferred: u64,
    pub duration: Duration,
}

/// Result of a completed pass
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub mode: SyncMode,
    pub actions: Vec<AppliedAction>,
    pub conflicts: Vec<ConflictRecord>,
    pub stats: SyncStats,
}

impl SyncReport {
    fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            actions: Vec::new(),
            conflicts: Vec::new(),
            stats: SyncStats::default(),
        }
    }

    /// True when the pass changed nothing on disk
    pub fn is_noop(&self) -> bool {
        self.actions.is_empty()
    }

    fn record(&mut self, action: AppliedAction) {
        match &action {
            AppliedAction::Copy { bytes, .. } => {
                self.stats.files_copied += 1;
                self.stats.bytes_transferred += bytes;
            }
            AppliedAction::Delete { .. } => self.stats.files_deleted += 1,
            AppliedAction::Create { bytes, .. } => {
                self.stats.files_created += 1;
                self.stats.bytes_transferred += bytes;
            }
            AppliedAction::Update { bytes, .. } => {
                self.stats.files_updated += 1;
                self.stats.bytes_transferred += bytes;
            }
        }
        self.actions.push(action);
    }
}

/// Drives synchronization passes against a shared [`SyncContext`].
///
/// Each pass snapshots both roots, classifies every path, and applies the
/// resulting actions in path order. The first snapshot or propagation error
/// stops the pass; actions already applied stay applied.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    context: Arc<SyncContext>,
    propagator: Propagator,
    comparison: Comparison,
    quiet: bool,
    json: bool,
}

impl SyncEngine {
    pub fn new(context: Arc<SyncContext>) -> Self {
        Self {
            context,
            propagator: Propagator::new(),
            comparison: Comparison::Metadata,
            quiet: true,
            json: false,
        }
    }

    pub fn with_comparison(mut self, comparison: Comparison) -> Self {
        self.comparison = comparison;
        self
    }

    /// Show a progress bar while actions are applied
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.quiet = !enabled;
        self
    }

    /// Emit NDJSON events on stdout
    pub fn with_json(mut self, enabled: bool) -> Self {
        self.json = enabled;
        self
    }

    pub fn context(&self) -> &Arc<SyncContext> {
        &self.context
    }

    pub fn set_conflict_callback<F>(&self, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.context.set_conflict_callback(handler);
    }

    /// One-way pass: make `destination` mirror `source`
    pub fn sync(&self, source: &Path, destination: &Path) -> Result<SyncReport> {
        self.run(&SyncSession::new(source, destination, SyncMode::OneWay))
    }

    /// Two-way pass: merge both trees, newer mtime wins
    pub fn sync_bidirectional(&self, source: &Path, destination: &Path) -> Result<SyncReport> {
        self.run(&SyncSession::new(source, destination, SyncMode::TwoWay))
    }

    pub fn run(&self, session: &SyncSession) -> Result<SyncReport> {
        let permit = self.begin()?;
        self.execute(permit, session)
    }

    /// Claim the context for a run without starting it.
    ///
    /// Lets a caller reject a trigger synchronously, then run the pass on a
    /// worker with [`SyncEngine::execute`].
    pub fn begin(&self) -> Result<RunPermit> {
        self.context.begin()
    }

    pub fn execute(&self, permit: RunPermit, session: &SyncSession) -> Result<SyncReport> {
        if !Arc::ptr_eq(permit.context(), &self.context) {
            return Err(SyncError::ForeignPermit);
        }

        let started = Instant::now();
        match self.run_pass(session) {
            Ok(mut report) => {
                report.stats.duration = started.elapsed();
                self.note(&format!(
                    "sync done: {} copied, {} deleted, {} created, {} updated, {} conflicts",
                    report.stats.files_copied,
                    report.stats.files_deleted,
                    report.stats.files_created,
                    report.stats.files_updated,
                    report.conflicts.len()
                ));
                if self.json {
                    emit_summary(&report);
                }
                permit.complete(RunStatus::Done);
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Sync failed: {}", e);
                self.context.log().error(&format!("sync failed: {}", e));
                if self.json {
                    SyncEvent::Error {
                        error: e.to_string(),
                    }
                    .emit();
                }
                permit.complete(RunStatus::Error(e.to_string()));
                Err(e)
            }
        }
    }

    fn run_pass(&self, session: &SyncSession) -> Result<SyncReport> {
        session.validate()?;

        tracing::info!(
            "Starting {} sync: {} → {}",
            session.mode,
            session.source.display(),
            session.destination.display()
        );
        self.context.log().info(&format!(
            "sync started ({}): {} -> {}",
            session.mode,
            session.source.display(),
            session.destination.display()
        ));

        let mut source = scanner::collect(&session.source)?;
        let mut destination = scanner::collect(&session.destination)?;
        tracing::info!(
            "Found {} files in source, {} in destination",
            source.len(),
            destination.len()
        );

        let classified = strategy::classify_with(self.comparison, &mut source, &mut destination)?;

        let mut report = SyncReport::new(session.mode);
        report.stats.source_files = source.len();
        report.stats.destination_files = destination.len();

        if self.json {
            SyncEvent::Start {
                source: session.source.clone(),
                destination: session.destination.clone(),
                mode: session.mode,
                total_paths: classified.len(),
            }
            .emit();
        }

        let pb = self.progress_bar(classified.len());

        // One-way deletes go first so a path that changed type between file
        // and directory is free before its copy lands
        let ordered: Vec<&Classified> = match session.mode {
            SyncMode::OneWay => {
                let (deletes, rest): (Vec<&Classified>, Vec<&Classified>) = classified
                    .iter()
                    .partition(|e| SyncAction::for_category(e.category) == SyncAction::Delete);
                deletes.into_iter().chain(rest).collect()
            }
            SyncMode::TwoWay => classified.iter().collect(),
        };

        for entry in ordered {
            pb.set_message(entry.path.clone());
            match session.mode {
                SyncMode::OneWay => self.apply_one_way(entry, &source, &destination, &mut report)?,
                SyncMode::TwoWay => self.apply_two_way(entry, &source, &destination, &mut report)?,
            }
            pb.inc(1);
        }

        pb.finish_and_clear();

        Ok(report)
    }

    fn apply_one_way(
        &self,
        entry: &Classified,
        source: &DirectorySnapshot,
        destination: &DirectorySnapshot,
        report: &mut SyncReport,
    ) -> Result<()> {
        let path = entry.path.as_str();

        match SyncAction::for_category(entry.category) {
            SyncAction::Copy => {
                self.propagator
                    .clear_target(destination.root(), path, Obstruction::Replace)?;
                let bytes = self
                    .propagator
                    .copy(&source.absolute(path), &destination.absolute(path))?;
                self.note(&format!("copy: {}", path));
                if self.json {
                    SyncEvent::Copy {
                        path: path.to_string(),
                        bytes_transferred: bytes,
                    }
                    .emit();
                }
                report.record(AppliedAction::Copy {
                    path: path.to_string(),
                    bytes,
                });
            }
            SyncAction::Delete => {
                self.propagator.remove(&destination.absolute(path))?;
                self.note(&format!("delete: {}", path));
                if self.json {
                    SyncEvent::Delete {
                        path: path.to_string(),
                    }
                    .emit();
                }
                report.record(AppliedAction::Delete {
                    path: path.to_string(),
                });
            }
            SyncAction::Skip => report.stats.files_skipped += 1,
        }

        Ok(())
    }

    fn apply_two_way(
        &self,
        entry: &Classified,
        source: &DirectorySnapshot,
        destination: &DirectorySnapshot,
        report: &mut SyncReport,
    ) -> Result<()> {
        let path = entry.path.as_str();

        match entry.category {
            Category::SameInBoth => report.stats.files_skipped += 1,
            Category::OnlyInA | Category::OnlyInB => {
                let from = if entry.category == Category::OnlyInA {
                    Side::Source
                } else {
                    Side::Dest
                };
                let to = from.opposite();
                let bytes = self.copy_between(path, from, source, destination)?;
                self.note(&format!("created: {}", path));
                if self.json {
                    SyncEvent::Create {
                        path: path.to_string(),
                        to,
                        bytes_transferred: bytes,
                    }
                    .emit();
                }
                report.record(AppliedAction::Create {
                    path: path.to_string(),
                    to,
                    bytes,
                });
            }
            Category::DifferInBoth => {
                let (a, b) = match (source.get(path), destination.get(path)) {
                    (Some(a), Some(b)) => (a, b),
                    _ => unreachable!("DifferInBoth path is in both snapshots"),
                };

                match bisync::resolve(a, b) {
                    Resolution::Wins(winner) => {
                        let bytes = self.copy_between(path, winner, source, destination)?;
                        self.note(&format!("update: {} ({} wins)", path, winner.as_str()));
                        if self.json {
                            SyncEvent::Update {
                                path: path.to_string(),
                                winner,
                                bytes_transferred: bytes,
                            }
                            .emit();
                        }
                        report.record(AppliedAction::Update {
                            path: path.to_string(),
                            winner,
                            bytes,
                        });
                    }
                    Resolution::Conflict => {
                        tracing::warn!(
                            "Conflict: {} (equal mtime, {} vs {} bytes)",
                            path,
                            a.size,
                            b.size
                        );
                        self.context.log().info(&format!("conflict: {}", path));
                        if self.json {
                            SyncEvent::Conflict {
                                path: path.to_string(),
                            }
                            .emit();
                        }
                        let record = ConflictRecord::new(path);
                        report.conflicts.push(record.clone());
                        self.context.record_conflict(record);
                    }
                }
            }
        }

        Ok(())
    }

    fn copy_between(
        &self,
        path: &str,
        from: Side,
        source: &DirectorySnapshot,
        destination: &DirectorySnapshot,
    ) -> Result<u64> {
        let (from_root, to_root) = match from {
            Side::Source => (source, destination),
            Side::Dest => (destination, source),
        };
        // Two-way never deletes: a blocked target fails the pass instead
        self.propagator
            .clear_target(to_root.root(), path, Obstruction::Fail)?;
        self.propagator
            .copy(&from_root.absolute(path), &to_root.absolute(path))
    }

    fn note(&self, message: &str) {
        tracing::info!("{}", message);
        self.context.log().info(message);
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if self.quiet || self.json {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }
}

fn emit_summary(report: &SyncReport) {
    SyncEvent::Summary {
        files_copied: report.stats.files_copied,
        files_deleted: report.stats.files_deleted,
        files_created: report.stats.files_created,
        files_updated: report.stats.files_updated,
        files_skipped: report.stats.files_skipped,
        conflicts: report.conflicts.len(),
        bytes_transferred: report.stats.bytes_transferred,
        duration_secs: report.stats.duration.as_secs_f64(),
    }
    .emit();
}
