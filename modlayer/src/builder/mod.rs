//! The rebuild pipeline: scan, merge, publish, retire.
//!
//! Given the active-mod list, a bounded worker pool walks each mod's
//! directory (or re-parents its associated files, or enumerates its
//! archives) into a *fresh* generation. When every scan unit is done the
//! fresh registry is conflict-sorted, the tree pruned, and the triple
//! atomically swapped into the live slot under a short write lock. The
//! replaced generation is torn down on a background retirement thread.
//!
//! ```text
//! Idle ──► Building ──► Merging ──► Publishing ──► Idle
//!                                        │
//!                                        └──► Retiring (background)
//! ```
//!
//! A rebuild requested while one is in flight waits for the in-flight
//! one to finish, then proceeds; there is no abort-and-restart.

mod progress;
mod retire;

pub use progress::{
    BuildPhase, MetricsSnapshot, Progress, ProgressCallback, ProgressSnapshot, RebuildMetrics,
};
pub use retire::RetirementQueue;

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::archive::ArchiveReader;
use crate::config::{AssociatedFile, BuilderConfig, ModEntry, Profile};
use crate::generation::Generation;
use crate::loadorder::{LoadOrderMap, LoadOrderProvider};
use crate::origin::{ArchiveRef, Origin};
use crate::walk::{DirectoryWalker, WalkVisitor};

use progress::PhaseCell;

/// External collaborators for one rebuild.
#[derive(Clone, Copy)]
pub struct RebuildSources<'a> {
    /// Directory-enumeration collaborator.
    pub walker: &'a dyn DirectoryWalker,

    /// Archive-reader collaborator; `None` disables archive contents
    /// regardless of [`BuilderConfig::parse_archives`].
    pub archives: Option<&'a dyn ArchiveReader>,

    /// Plugin load-order collaborator; `None` leaves all archives
    /// unordered.
    pub load_order: Option<&'a dyn LoadOrderProvider>,
}

/// One unit of scan work: the base data directory or one mod.
struct ScanUnit<'a> {
    name: &'a str,
    path: &'a Path,
    priority: i32,
    archives: &'a [PathBuf],
    associated: &'a [AssociatedFile],
}

/// Builds and owns the live generation.
pub struct GraphBuilder {
    config: BuilderConfig,
    live: RwLock<Arc<Generation>>,
    rebuild_gate: Mutex<()>,
    phase: PhaseCell,
    progress: Arc<Progress>,
    metrics: Arc<RebuildMetrics>,
    retirement: RetirementQueue,
}

impl GraphBuilder {
    /// Create a builder with an empty live generation.
    pub fn new(config: BuilderConfig) -> Self {
        Self {
            config,
            live: RwLock::new(Arc::new(Generation::new())),
            rebuild_gate: Mutex::new(()),
            phase: PhaseCell::default(),
            progress: Arc::new(Progress::default()),
            metrics: Arc::new(RebuildMetrics::default()),
            retirement: RetirementQueue::new(),
        }
    }

    /// The builder's configuration.
    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// The currently published generation.
    ///
    /// The returned snapshot stays fully valid even if a rebuild
    /// publishes a newer one while the caller holds it.
    pub fn generation(&self) -> Arc<Generation> {
        Arc::clone(&self.live.read())
    }

    /// Current phase of the rebuild state machine.
    pub fn phase(&self) -> BuildPhase {
        self.phase.get()
    }

    /// Progress counters of the current or last rebuild.
    pub fn progress(&self) -> Arc<Progress> {
        Arc::clone(&self.progress)
    }

    /// Metrics of the current or last rebuild.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Whether an old generation is still being torn down.
    pub fn is_retiring(&self) -> bool {
        self.retirement.is_retiring()
    }

    /// Block until any background teardown completes.
    pub fn wait_for_retirement(&self) {
        self.retirement.wait_idle();
    }

    /// Run a full rebuild from `profile` and publish the result.
    ///
    /// Blocks until the new generation is published. A call made while
    /// another rebuild is in flight waits for it, then runs. Per-mod
    /// failures degrade that mod's contribution and never abort the
    /// rebuild.
    pub fn rebuild(&self, profile: &Profile, sources: RebuildSources<'_>) -> Arc<Generation> {
        self.rebuild_with_progress(profile, sources, None)
    }

    /// [`rebuild`](Self::rebuild) with a push-based progress callback,
    /// invoked on every completed scan unit and once at finish.
    pub fn rebuild_with_progress(
        &self,
        profile: &Profile,
        sources: RebuildSources<'_>,
        callback: Option<ProgressCallback>,
    ) -> Arc<Generation> {
        let _gate = self.rebuild_gate.lock();
        let started = std::time::Instant::now();

        // Building: populate a fresh triple with a bounded worker pool.
        self.phase.set(BuildPhase::Building);
        self.metrics.reset();

        let fresh = Arc::new(Generation::new());
        let load_map = match sources.load_order {
            Some(provider) => LoadOrderMap::from_provider(provider),
            None => LoadOrderMap::default(),
        };

        let mut units: VecDeque<ScanUnit<'_>> = VecDeque::with_capacity(profile.mods.len() + 1);
        units.push_back(ScanUnit {
            name: &self.config.data_origin_name,
            path: &profile.data_path,
            priority: self.config.data_origin_priority,
            archives: &[],
            associated: &[],
        });
        for entry in &profile.mods {
            units.push_back(Self::unit_for(entry));
        }

        self.progress.start(units.len());
        info!(
            mods = profile.mods.len(),
            threads = self.config.worker_threads,
            "rebuild started"
        );

        self.scan_all(units, &fresh, &load_map, sources, callback.as_ref());

        // Merging: concurrent insertion order does not guarantee priority
        // order, so the full re-sort is mandatory, not an optimization.
        self.phase.set(BuildPhase::Merging);
        fresh.files().sort_all(fresh.origins());
        fresh.tree().prune_irrelevant(
            fresh.files(),
            fresh.origins(),
            &self.config.prune_files,
            &self.config.prune_dirs,
        );

        // Publishing: pointer swap only, under a short write lock.
        self.phase.set(BuildPhase::Publishing);
        let old = {
            let mut live = self.live.write();
            std::mem::replace(&mut *live, Arc::clone(&fresh))
        };
        self.retirement.retire(old);

        self.progress.finish();
        if let Some(callback) = &callback {
            callback(self.progress.snapshot());
        }
        self.phase.set(BuildPhase::Idle);
        info!(
            files = fresh.files().count(),
            origins = fresh.origins().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "rebuild published"
        );
        fresh
    }

    fn unit_for(entry: &ModEntry) -> ScanUnit<'_> {
        ScanUnit {
            name: &entry.name,
            path: &entry.path,
            priority: entry.priority,
            archives: &entry.archives,
            associated: &entry.associated_files,
        }
    }

    /// Drain the unit queue with `worker_threads` pool workers, each
    /// taking the next unit as it goes idle.
    fn scan_all(
        &self,
        units: VecDeque<ScanUnit<'_>>,
        fresh: &Arc<Generation>,
        load_map: &LoadOrderMap,
        sources: RebuildSources<'_>,
        callback: Option<&ProgressCallback>,
    ) {
        let queue = Mutex::new(units);
        let worker = |_: &rayon::Scope<'_>| loop {
            let Some(unit) = queue.lock().pop_front() else {
                return;
            };
            let name = unit.name.to_string();
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
                self.scan_unit(&unit, fresh, load_map, sources);
            }));
            if outcome.is_err() {
                error!(mod_name = %name, "scan worker panicked, contribution incomplete");
                self.metrics.scan_error();
            }
            self.metrics.mod_scanned();
            self.progress.unit_done();
            if let Some(callback) = callback {
                callback(self.progress.snapshot());
            }
        };

        let threads = self.config.worker_threads.max(1);
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.scope(|scope| {
                for _ in 0..threads {
                    scope.spawn(&worker);
                }
            }),
            Err(e) => {
                // Degrade to a serial scan on the calling thread.
                warn!(error = %e, "worker pool unavailable, scanning serially");
                rayon::scope(|scope| worker(scope));
            }
        }
    }

    /// Scan one mod (or the base data directory) into the fresh triple.
    fn scan_unit(
        &self,
        unit: &ScanUnit<'_>,
        fresh: &Generation,
        load_map: &LoadOrderMap,
        sources: RebuildSources<'_>,
    ) {
        let origin = fresh
            .origins()
            .get_or_create(unit.name, unit.path, unit.priority);

        if !unit.associated.is_empty() {
            // Pseudo-mod: the files already exist under the data path;
            // re-parent them instead of re-scanning disk.
            for file in unit.associated {
                fresh.tree().insert_path(
                    &origin,
                    &file.relative_path,
                    file.last_write.unwrap_or(SystemTime::UNIX_EPOCH),
                    None,
                    fresh.files(),
                    fresh.origins(),
                );
                self.metrics.loose_file();
            }
        } else {
            let mut visitor = InsertVisitor {
                origin: &origin,
                fresh,
                metrics: &self.metrics,
            };
            if let Err(e) = sources.walker.walk(unit.path, &mut visitor) {
                warn!(mod_name = unit.name, error = %e, "mod directory scan failed");
                self.metrics.scan_error();
            }
        }

        if self.config.parse_archives {
            if let Some(reader) = sources.archives {
                for archive_path in unit.archives {
                    self.scan_archive(archive_path, &origin, fresh, load_map, reader);
                }
            }
        }
        debug!(mod_name = unit.name, files = origin.file_count(), "mod scanned");
    }

    fn scan_archive(
        &self,
        archive_path: &Path,
        origin: &Origin,
        fresh: &Generation,
        load_map: &LoadOrderMap,
        reader: &dyn ArchiveReader,
    ) {
        let archive_name = archive_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| archive_path.to_string_lossy().into_owned());

        let root = match reader.read(archive_path) {
            Ok(root) => root,
            Err(e) => {
                warn!(archive = %archive_path.display(), error = %e, "skipping unreadable archive");
                self.metrics.scan_error();
                return;
            }
        };
        self.metrics.archive_read();

        let load_order = load_map.resolve_archive(&archive_name);
        root.for_each_file(|relative, _entry| {
            fresh.tree().insert_path(
                origin,
                relative,
                SystemTime::UNIX_EPOCH,
                Some(ArchiveRef::new(archive_name.clone(), load_order)),
                fresh.files(),
                fresh.origins(),
            );
            self.metrics.archive_file();
        });
    }
}

impl std::fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("phase", &self.phase())
            .field("retiring", &self.is_retiring())
            .finish()
    }
}

/// Walk visitor inserting every reported file for one origin.
struct InsertVisitor<'a> {
    origin: &'a Arc<Origin>,
    fresh: &'a Generation,
    metrics: &'a RebuildMetrics,
}

impl WalkVisitor for InsertVisitor<'_> {
    fn enter_directory(&mut self, _relative: &Path) {}

    fn leave_directory(&mut self, _relative: &Path) {}

    fn file(&mut self, relative: &Path, last_write: SystemTime) {
        let relative = relative.to_string_lossy();
        self.fresh.tree().insert_path(
            self.origin,
            &relative,
            last_write,
            None,
            self.fresh.files(),
            self.fresh.origins(),
        );
        self.metrics.loose_file();
    }
}
