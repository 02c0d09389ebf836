//! Origins: the named, prioritized sources contributing files to the view.
//!
//! An [`Origin`] is the base game data directory, a mod directory, or a
//! pseudo-mod grouping files counted elsewhere. Origins are totally ordered
//! by priority; when two origins provide the same virtual path, priority
//! (plus the loose-beats-archive rule in [`crate::file`]) decides which one
//! wins.

mod registry;

pub use registry::OriginRegistry;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use parking_lot::Mutex;

use crate::file::FileIndex;

/// Identifier of an [`Origin`], unique within one registry generation.
///
/// Ids are assigned once per generation and never reused within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OriginId(pub(crate) u32);

impl OriginId {
    /// Raw numeric value, for logging and display.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for OriginId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "origin#{}", self.0)
    }
}

/// Provenance of a file entry that came out of a game archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRef {
    /// Archive file name (basename with extension, e.g. `Mod - Textures.bsa`).
    pub name: String,

    /// Position of the archive's owning plugin in the load order.
    ///
    /// `None` when no plugin matched the archive name; such archives still
    /// contribute files, they just cannot be ordered against siblings.
    pub load_order: Option<usize>,
}

impl ArchiveRef {
    /// Create a new archive reference.
    pub fn new(name: impl Into<String>, load_order: Option<usize>) -> Self {
        Self {
            name: name.into(),
            load_order,
        }
    }
}

/// One origin's claim on a file: which origin, and from which archive.
///
/// A loose file (straight from the origin's directory) has no archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginRef {
    /// The contributing origin.
    pub origin: OriginId,

    /// Archive provenance, `None` for loose files.
    pub archive: Option<ArchiveRef>,
}

impl OriginRef {
    /// Reference a loose file provided by `origin`.
    pub fn loose(origin: OriginId) -> Self {
        Self {
            origin,
            archive: None,
        }
    }

    /// Reference a file provided by `origin` through an archive.
    pub fn archived(origin: OriginId, archive: ArchiveRef) -> Self {
        Self {
            origin,
            archive: Some(archive),
        }
    }

    /// Whether this entry is a loose file (not from an archive).
    pub fn is_loose(&self) -> bool {
        self.archive.is_none()
    }
}

/// A single contributing source of files.
///
/// The origin owns the set of file indices it currently contributes. Name
/// and priority are independently mutable (the registry keeps its lookup
/// indices in sync for renames); the path is fixed at creation.
#[derive(Debug)]
pub struct Origin {
    id: OriginId,
    name: Mutex<String>,
    path: PathBuf,
    priority: AtomicI32,
    enabled: AtomicBool,
    files: Mutex<BTreeSet<FileIndex>>,
}

impl Origin {
    pub(crate) fn new(
        id: OriginId,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        priority: i32,
    ) -> Self {
        Self {
            id,
            name: Mutex::new(name.into()),
            path: path.into(),
            priority: AtomicI32::new(priority),
            enabled: AtomicBool::new(true),
            files: Mutex::new(BTreeSet::new()),
        }
    }

    /// The origin's id.
    pub fn id(&self) -> OriginId {
        self.id
    }

    /// The origin's current name.
    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    pub(crate) fn set_name(&self, name: impl Into<String>) {
        *self.name.lock() = name.into();
    }

    /// Filesystem path of the origin's own directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current priority. Higher priority wins conflicts.
    pub fn priority(&self) -> i32 {
        self.priority.load(Ordering::Acquire)
    }

    /// Change the priority.
    ///
    /// Priority changes do not propagate to file records automatically;
    /// call [`crate::file::FileRegistry::sort_all`] afterwards.
    pub fn set_priority(&self, priority: i32) {
        self.priority.store(priority, Ordering::Release);
    }

    /// Whether the origin currently contributes to the view.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Record that this origin provides the file at `index`.
    pub fn add_file(&self, index: FileIndex) {
        self.files.lock().insert(index);
    }

    /// Forget a single file. No-op when the index was not present.
    pub fn remove_file(&self, index: FileIndex) {
        self.files.lock().remove(&index);
    }

    /// Whether this origin provides the file at `index`.
    pub fn contains_file(&self, index: FileIndex) -> bool {
        self.files.lock().contains(&index)
    }

    /// Snapshot of the owned file indices.
    pub fn files(&self) -> Vec<FileIndex> {
        self.files.lock().iter().copied().collect()
    }

    /// Number of files this origin currently provides.
    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }

    /// Drain and return the owned file set.
    ///
    /// Used by the bulk disable path, which clears the set exactly once.
    pub(crate) fn take_files(&self) -> Vec<FileIndex> {
        let mut guard = self.files.lock();
        let drained: Vec<FileIndex> = guard.iter().copied().collect();
        guard.clear();
        drained
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (priority {}, {})",
            self.name(),
            self.priority(),
            if self.is_enabled() {
                "enabled"
            } else {
                "disabled"
            }
        )
    }
}
