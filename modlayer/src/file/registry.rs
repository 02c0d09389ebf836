//! Stable-index store over file records.
//!
//! Backed by a growable slot vector that is never compacted: a removed
//! record leaves a hole, so a [`FileIndex`] handed out once is never
//! reassigned within the generation (property the whole cross-referencing
//! design relies on). The live count is tracked incrementally because the
//! backing length is not the count.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use super::{FileIndex, FileRecord};
use crate::origin::{Origin, OriginRegistry};
use crate::tree::{DirIndex, DirectoryTree};

/// Owns every [`FileRecord`] of one generation.
#[derive(Default)]
pub struct FileRegistry {
    slots: RwLock<Vec<Option<Arc<FileRecord>>>>,
    live: AtomicUsize,
}

impl FileRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next index and create a record for `name` under `parent`.
    pub fn create(&self, name: &str, parent: DirIndex) -> Arc<FileRecord> {
        let mut slots = self.slots.write();
        let index = FileIndex(slots.len() as u32);
        let record = Arc::new(FileRecord::new(index, name, parent));
        slots.push(Some(Arc::clone(&record)));
        self.live.fetch_add(1, Ordering::Relaxed);
        record
    }

    /// Look up a record by index.
    ///
    /// Holes and out-of-range indices return `None`; both indicate a stale
    /// index from a prior bug and are logged, never fatal.
    pub fn get(&self, index: FileIndex) -> Option<Arc<FileRecord>> {
        let slots = self.slots.read();
        match slots.get(index.as_usize()) {
            Some(Some(record)) => Some(Arc::clone(record)),
            Some(None) => {
                warn!(%index, "lookup of a removed file index");
                None
            }
            None => {
                warn!(%index, len = slots.len(), "file index out of range");
                None
            }
        }
    }

    /// Remove a record and cascade: the index is dropped from every
    /// providing origin's file set and from the owning directory node.
    ///
    /// Safe to call with an already-empty or out-of-range index (logged,
    /// no-op).
    pub fn remove(&self, index: FileIndex, origins: &OriginRegistry, tree: &DirectoryTree) {
        let Some(record) = self.take_slot(index) else {
            warn!(%index, "remove of an empty or out-of-range file index");
            return;
        };

        for origin_id in record.origins() {
            match origins.find_by_id(origin_id) {
                Some(origin) => origin.remove_file(index),
                None => {
                    tracing::error!(%index, %origin_id, "removed file referenced an unknown origin")
                }
            }
        }
        tree.detach_file(record.parent(), record.name(), index);
    }

    /// Withdraw an origin's entire contribution without a full rebuild.
    ///
    /// Files solely provided by the origin are removed from the registry
    /// and their directories; files with remaining origins are re-ranked
    /// in place. The origin's own file set is cleared and the origin
    /// disabled.
    pub fn disable_origin(&self, origin: &Origin, tree: &DirectoryTree) {
        origin.set_enabled(false);
        let indices = origin.take_files();
        let mut removed = 0usize;
        for index in indices {
            let Some(record) = self.get(index) else {
                continue;
            };
            if record.remove_origin(origin.id()) {
                if self.take_slot(index).is_some() {
                    removed += 1;
                }
                tree.detach_file(record.parent(), record.name(), index);
            }
        }
        tracing::debug!(origin = %origin.name(), removed, "origin disabled");
    }

    /// Re-sort every live record's origin list.
    ///
    /// Mandatory once per rebuild after all workers finish: concurrent
    /// insertion order does not guarantee priority order when workers race
    /// to add alternatives for the same path.
    pub fn sort_all(&self, origins: &OriginRegistry) {
        for record in self.records() {
            record.sort_origins(origins);
        }
    }

    /// Number of live (non-hole) records.
    pub fn count(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    /// Whether no live records exist.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Snapshot of all live records.
    pub fn records(&self) -> Vec<Arc<FileRecord>> {
        self.slots.read().iter().flatten().cloned().collect()
    }

    /// Clear a slot, returning its record. `None` for holes/out-of-range.
    fn take_slot(&self, index: FileIndex) -> Option<Arc<FileRecord>> {
        let mut slots = self.slots.write();
        let record = slots.get_mut(index.as_usize())?.take()?;
        self.live.fetch_sub(1, Ordering::Relaxed);
        Some(record)
    }
}

impl std::fmt::Debug for FileRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRegistry")
            .field("count", &self.count())
            .field("slots", &self.slots.read().len())
            .finish()
    }
}
