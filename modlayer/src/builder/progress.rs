//! Rebuild progress and metrics.
//!
//! Lock-free atomic counters updated by the scan workers, snapshotted
//! into plain structs for display. Consumers either poll
//! [`Progress::snapshot`] or register a push callback with the builder.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

/// Phase of the rebuild state machine.
///
/// `Retiring` runs in the background and does not block the next build,
/// so it is exposed as a separate flag on the builder, not a phase here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    /// No rebuild in flight.
    Idle,
    /// Workers are scanning mods into the fresh triple.
    Building,
    /// Conflict sort and prune over the finished triple.
    Merging,
    /// Swapping the fresh triple into the live slot.
    Publishing,
}

impl BuildPhase {
    fn as_u8(self) -> u8 {
        match self {
            BuildPhase::Idle => 0,
            BuildPhase::Building => 1,
            BuildPhase::Merging => 2,
            BuildPhase::Publishing => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => BuildPhase::Building,
            2 => BuildPhase::Merging,
            3 => BuildPhase::Publishing,
            _ => BuildPhase::Idle,
        }
    }
}

impl std::fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BuildPhase::Idle => "idle",
            BuildPhase::Building => "building",
            BuildPhase::Merging => "merging",
            BuildPhase::Publishing => "publishing",
        };
        write!(f, "{}", name)
    }
}

/// Cell holding the current phase.
#[derive(Debug, Default)]
pub(crate) struct PhaseCell(AtomicU8);

impl PhaseCell {
    pub(crate) fn set(&self, phase: BuildPhase) {
        self.0.store(phase.as_u8(), Ordering::Release);
    }

    pub(crate) fn get(&self) -> BuildPhase {
        BuildPhase::from_u8(self.0.load(Ordering::Acquire))
    }
}

/// Point-in-time copy of the progress counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Total scan units (mods plus the base data directory).
    pub total: usize,

    /// Completed scan units.
    pub done: usize,

    /// Whether the rebuild has finished (published).
    pub finished: bool,
}

impl ProgressSnapshot {
    /// Completion percentage; 100 when there is nothing to do.
    pub fn percent_done(&self) -> usize {
        if self.total == 0 {
            100
        } else {
            self.done * 100 / self.total
        }
    }
}

/// Shared progress counters for one builder.
#[derive(Debug, Default)]
pub struct Progress {
    total: AtomicUsize,
    done: AtomicUsize,
    finished: AtomicBool,
}

impl Progress {
    pub(crate) fn start(&self, total: usize) {
        self.total.store(total, Ordering::Release);
        self.done.store(0, Ordering::Release);
        self.finished.store(false, Ordering::Release);
    }

    pub(crate) fn unit_done(&self) {
        self.done.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn finish(&self) {
        self.finished.store(true, Ordering::Release);
    }

    /// Current counters.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total.load(Ordering::Acquire),
            done: self.done.load(Ordering::Acquire),
            finished: self.finished.load(Ordering::Acquire),
        }
    }

    /// Completion percentage; 100 when there is nothing to do.
    pub fn percent_done(&self) -> usize {
        self.snapshot().percent_done()
    }
}

/// Push-based progress receiver, called on every completed scan unit and
/// once at rebuild finish. Invoked from worker threads.
pub type ProgressCallback = Arc<dyn Fn(ProgressSnapshot) + Send + Sync>;

/// Point-in-time copy of the rebuild metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Loose files inserted from directory walks.
    pub loose_files: u64,

    /// Files inserted from archives.
    pub archive_files: u64,

    /// Archives successfully enumerated.
    pub archives_read: u64,

    /// Mods (scan units) completed.
    pub mods_scanned: u64,

    /// Recoverable scan failures (walks, archives, panics).
    pub scan_errors: u64,
}

/// Lock-free counters describing the last or in-flight rebuild.
#[derive(Debug, Default)]
pub struct RebuildMetrics {
    loose_files: AtomicU64,
    archive_files: AtomicU64,
    archives_read: AtomicU64,
    mods_scanned: AtomicU64,
    scan_errors: AtomicU64,
}

impl RebuildMetrics {
    pub(crate) fn reset(&self) {
        self.loose_files.store(0, Ordering::Release);
        self.archive_files.store(0, Ordering::Release);
        self.archives_read.store(0, Ordering::Release);
        self.mods_scanned.store(0, Ordering::Release);
        self.scan_errors.store(0, Ordering::Release);
    }

    pub(crate) fn loose_file(&self) {
        self.loose_files.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn archive_file(&self) {
        self.archive_files.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn archive_read(&self) {
        self.archives_read.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mod_scanned(&self) {
        self.mods_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn scan_error(&self) {
        self.scan_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            loose_files: self.loose_files.load(Ordering::Relaxed),
            archive_files: self.archive_files.load(Ordering::Relaxed),
            archives_read: self.archives_read.load(Ordering::Relaxed),
            mods_scanned: self.mods_scanned.load(Ordering::Relaxed),
            scan_errors: self.scan_errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_done_empty_is_hundred() {
        let progress = Progress::default();
        progress.start(0);
        assert_eq!(progress.percent_done(), 100);
    }

    #[test]
    fn test_percent_done_counts_units() {
        let progress = Progress::default();
        progress.start(4);
        assert_eq!(progress.percent_done(), 0);
        progress.unit_done();
        assert_eq!(progress.percent_done(), 25);
        progress.unit_done();
        progress.unit_done();
        progress.unit_done();
        assert_eq!(progress.percent_done(), 100);
        assert!(!progress.snapshot().finished);
        progress.finish();
        assert!(progress.snapshot().finished);
    }

    #[test]
    fn test_start_resets_previous_run() {
        let progress = Progress::default();
        progress.start(2);
        progress.unit_done();
        progress.finish();

        progress.start(3);
        let snap = progress.snapshot();
        assert_eq!(snap.done, 0);
        assert_eq!(snap.total, 3);
        assert!(!snap.finished);
    }

    #[test]
    fn test_phase_cell_roundtrip() {
        let cell = PhaseCell::default();
        assert_eq!(cell.get(), BuildPhase::Idle);
        for phase in [
            BuildPhase::Building,
            BuildPhase::Merging,
            BuildPhase::Publishing,
            BuildPhase::Idle,
        ] {
            cell.set(phase);
            assert_eq!(cell.get(), phase);
        }
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(BuildPhase::Building.to_string(), "building");
        assert_eq!(BuildPhase::Idle.to_string(), "idle");
    }

    #[test]
    fn test_metrics_counters() {
        let metrics = RebuildMetrics::default();
        metrics.loose_file();
        metrics.loose_file();
        metrics.archive_file();
        metrics.archive_read();
        metrics.mod_scanned();
        metrics.scan_error();

        let snap = metrics.snapshot();
        assert_eq!(snap.loose_files, 2);
        assert_eq!(snap.archive_files, 1);
        assert_eq!(snap.archives_read, 1);
        assert_eq!(snap.mods_scanned, 1);
        assert_eq!(snap.scan_errors, 1);

        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }
}
