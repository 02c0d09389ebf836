//! Registry of origins for one generation.
//!
//! A single mutex guards the id and name lookup maps. Origin field
//! mutation (`set_priority`, `set_name`) happens on the [`Origin`] itself;
//! only [`rename`](OriginRegistry::rename) touches the registry indices.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use super::{Origin, OriginId};

#[derive(Default)]
struct Maps {
    by_id: HashMap<OriginId, Arc<Origin>>,
    by_name: HashMap<String, OriginId>,
}

/// Owns the set of origins for one generation and maps name ↔ id.
#[derive(Default)]
pub struct OriginRegistry {
    maps: Mutex<Maps>,
    next_id: AtomicU32,
}

impl OriginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an origin by name; create it if absent.
    ///
    /// An existing origin is re-enabled and returned as-is (its path and
    /// priority are left untouched).
    pub fn get_or_create(
        &self,
        name: &str,
        path: impl Into<PathBuf>,
        priority: i32,
    ) -> Arc<Origin> {
        let mut maps = self.maps.lock();
        if let Some(id) = maps.by_name.get(name) {
            if let Some(origin) = maps.by_id.get(id) {
                origin.set_enabled(true);
                return Arc::clone(origin);
            }
        }
        self.insert_locked(&mut maps, name, path.into(), priority)
    }

    /// Unconditionally create a new origin.
    ///
    /// The caller is responsible for name uniqueness; a duplicate name
    /// shadows the older origin in the name index.
    pub fn create(&self, name: &str, path: impl Into<PathBuf>, priority: i32) -> Arc<Origin> {
        let mut maps = self.maps.lock();
        self.insert_locked(&mut maps, name, path.into(), priority)
    }

    fn insert_locked(
        &self,
        maps: &mut Maps,
        name: &str,
        path: PathBuf,
        priority: i32,
    ) -> Arc<Origin> {
        let id = OriginId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let origin = Arc::new(Origin::new(id, name, path, priority));
        maps.by_id.insert(id, Arc::clone(&origin));
        maps.by_name.insert(name.to_string(), id);
        origin
    }

    /// Look up an origin by id. Returns `None` for unknown ids.
    pub fn find_by_id(&self, id: OriginId) -> Option<Arc<Origin>> {
        self.maps.lock().by_id.get(&id).cloned()
    }

    /// Look up an origin by name. Returns `None` for unknown names.
    pub fn find_by_name(&self, name: &str) -> Option<Arc<Origin>> {
        let maps = self.maps.lock();
        let id = maps.by_name.get(name)?;
        maps.by_id.get(id).cloned()
    }

    /// Whether an origin with the given name exists.
    pub fn origin_exists(&self, name: &str) -> bool {
        self.maps.lock().by_name.contains_key(name)
    }

    /// Rename an origin, keeping the name index in sync.
    ///
    /// If `new_name` already maps to a *different* origin, that stale
    /// mapping is evicted with a warning; this indicates desynchronized
    /// caller state, never a reason to crash.
    pub fn rename(&self, old_name: &str, new_name: &str) {
        let mut maps = self.maps.lock();
        let Some(id) = maps.by_name.remove(old_name) else {
            warn!(old_name, new_name, "rename of unknown origin ignored");
            return;
        };
        if let Some(stale) = maps.by_name.get(new_name) {
            if *stale != id {
                warn!(
                    new_name,
                    evicted = %stale,
                    "name already mapped to a different origin, evicting stale mapping"
                );
            }
        }
        maps.by_name.insert(new_name.to_string(), id);
        if let Some(origin) = maps.by_id.get(&id) {
            origin.set_name(new_name);
        }
    }

    /// Number of origins in the registry.
    pub fn len(&self) -> usize {
        self.maps.lock().by_id.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.maps.lock().by_id.is_empty()
    }

    /// Snapshot of all origins, sorted by descending priority.
    pub fn origins(&self) -> Vec<Arc<Origin>> {
        let mut all: Vec<Arc<Origin>> = self.maps.lock().by_id.values().cloned().collect();
        all.sort_by_key(|o| std::cmp::Reverse(o.priority()));
        all
    }

    /// Priority of an origin, for conflict ranking.
    ///
    /// An id that resolves to no origin is a structural inconsistency from
    /// a prior bug; it ranks below every real origin and is logged.
    pub(crate) fn priority_of(&self, id: OriginId) -> i32 {
        match self.find_by_id(id) {
            Some(origin) => origin.priority(),
            None => {
                tracing::error!(%id, "file references an origin missing from the registry");
                i32::MIN
            }
        }
    }
}

impl std::fmt::Debug for OriginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OriginRegistry")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_assigns_fresh_ids() {
        let reg = OriginRegistry::new();
        let a = reg.create("data", "/game/data", 0);
        let b = reg.create("ModA", "/mods/ModA", 1);
        assert_ne!(a.id(), b.id());
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_get_or_create_returns_existing() {
        let reg = OriginRegistry::new();
        let a = reg.get_or_create("ModA", "/mods/ModA", 1);
        a.set_enabled(false);

        let again = reg.get_or_create("ModA", "/other/path", 99);
        assert_eq!(again.id(), a.id());
        // Existing origin is re-enabled but otherwise untouched.
        assert!(again.is_enabled());
        assert_eq!(again.priority(), 1);
        assert_eq!(again.path(), std::path::Path::new("/mods/ModA"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_find_by_id_and_name() {
        let reg = OriginRegistry::new();
        let a = reg.create("ModA", "/mods/ModA", 1);

        assert_eq!(reg.find_by_id(a.id()).unwrap().name(), "ModA");
        assert_eq!(reg.find_by_name("ModA").unwrap().id(), a.id());
        assert!(reg.find_by_id(OriginId(999)).is_none());
        assert!(reg.find_by_name("nope").is_none());
        assert!(reg.origin_exists("ModA"));
        assert!(!reg.origin_exists("nope"));
    }

    #[test]
    fn test_rename_updates_index() {
        let reg = OriginRegistry::new();
        let a = reg.create("Old", "/mods/Old", 1);

        reg.rename("Old", "New");
        assert!(reg.find_by_name("Old").is_none());
        assert_eq!(reg.find_by_name("New").unwrap().id(), a.id());
        assert_eq!(a.name(), "New");
    }

    #[test]
    fn test_rename_evicts_stale_mapping() {
        let reg = OriginRegistry::new();
        let a = reg.create("A", "/mods/A", 1);
        let b = reg.create("B", "/mods/B", 2);

        // "B" now resolves to origin A; B's stale mapping is evicted.
        reg.rename("A", "B");
        assert_eq!(reg.find_by_name("B").unwrap().id(), a.id());
        // Origin B still exists and is reachable by id.
        assert_eq!(reg.find_by_id(b.id()).unwrap().id(), b.id());
    }

    #[test]
    fn test_rename_unknown_is_noop() {
        let reg = OriginRegistry::new();
        reg.create("A", "/mods/A", 1);
        reg.rename("missing", "whatever");
        assert_eq!(reg.len(), 1);
        assert!(reg.find_by_name("whatever").is_none());
    }

    #[test]
    fn test_origins_sorted_by_descending_priority() {
        let reg = OriginRegistry::new();
        reg.create("low", "/low", 0);
        reg.create("high", "/high", 9);
        reg.create("mid", "/mid", 4);

        let names: Vec<_> = reg.origins().iter().map(|o| o.name()).collect();
        assert_eq!(names, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_priority_of_missing_origin_ranks_last() {
        let reg = OriginRegistry::new();
        assert_eq!(reg.priority_of(OriginId(42)), i32::MIN);
    }
}
