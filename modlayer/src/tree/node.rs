//! A single directory in the merged namespace.
//!
//! Each node carries independent locks for its file map and its subdir
//! map rather than one lock for the whole tree: concurrent rebuild
//! workers usually touch disjoint subtrees and only collide on shared
//! ancestors (two mods both populating `textures/`), so the lock surface
//! stays per-map. Map keys are case-folded; the original-case name is
//! kept for display.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;
use tracing::warn;

use super::DirIndex;
use crate::file::FileIndex;
use crate::origin::OriginId;
use crate::paths::fold_case;

/// One directory node, owned by the generation's tree arena.
#[derive(Debug)]
pub struct DirectoryNode {
    name: String,
    parent: Option<DirIndex>,
    /// Folded file name → file index, sorted by key.
    files: Mutex<BTreeMap<String, FileIndex>>,
    /// Folded subdir name → node index, sorted by key.
    subdirs: Mutex<BTreeMap<String, DirIndex>>,
    /// Every origin contributing anything anywhere in this subtree.
    origins: Mutex<BTreeSet<OriginId>>,
}

impl DirectoryNode {
    pub(crate) fn new(name: impl Into<String>, parent: Option<DirIndex>) -> Self {
        Self {
            name: name.into(),
            parent,
            files: Mutex::new(BTreeMap::new()),
            subdirs: Mutex::new(BTreeMap::new()),
            origins: Mutex::new(BTreeSet::new()),
        }
    }

    /// Directory name, original case preserved. Empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index of the parent directory; `None` for the root.
    pub fn parent(&self) -> Option<DirIndex> {
        self.parent
    }

    /// Whether this is the root of the merged view.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Look up a file by name, folding case first.
    pub fn file(&self, name: &str) -> Option<FileIndex> {
        self.file_lower(&fold_case(name))
    }

    /// Look up a file by an already-folded name.
    ///
    /// Hot-path variant that skips redundant case folding; the input is
    /// trusted, so a mixed-case name simply misses.
    pub fn file_lower(&self, lower: &str) -> Option<FileIndex> {
        self.files.lock().get(lower).copied()
    }

    /// Look up a subdirectory by name, folding case first.
    pub fn subdir(&self, name: &str) -> Option<DirIndex> {
        self.subdir_lower(&fold_case(name))
    }

    /// Look up a subdirectory by an already-folded name.
    pub fn subdir_lower(&self, lower: &str) -> Option<DirIndex> {
        self.subdirs.lock().get(lower).copied()
    }

    /// Fetch the file entry for `lower`, creating it via `create` when
    /// absent. Returns the index and whether it was newly inserted.
    ///
    /// The map lock is held across the check and insert so two workers
    /// racing on a new name cannot allocate two records for one path.
    pub(crate) fn file_entry_or_insert_with(
        &self,
        lower: &str,
        create: impl FnOnce() -> FileIndex,
    ) -> (FileIndex, bool) {
        let mut files = self.files.lock();
        if let Some(index) = files.get(lower) {
            return (*index, false);
        }
        let index = create();
        files.insert(lower.to_string(), index);
        (index, true)
    }

    /// Fetch the subdir entry for `lower`, creating the node via `create`
    /// when absent. Returns the index and whether it was newly inserted.
    pub(crate) fn subdir_entry_or_insert_with(
        &self,
        lower: &str,
        create: impl FnOnce() -> DirIndex,
    ) -> (DirIndex, bool) {
        let mut subdirs = self.subdirs.lock();
        if let Some(index) = subdirs.get(lower) {
            return (*index, false);
        }
        let index = create();
        subdirs.insert(lower.to_string(), index);
        (index, true)
    }

    /// Remove the file entry for `name` if it still maps to `expected`.
    pub(crate) fn remove_file_entry(&self, name: &str, expected: FileIndex) -> bool {
        let lower = fold_case(name);
        let mut files = self.files.lock();
        match files.get(&lower) {
            Some(index) if *index == expected => {
                files.remove(&lower);
                true
            }
            Some(index) => {
                warn!(
                    name,
                    found = %index,
                    %expected,
                    "file entry maps to a different index, leaving it in place"
                );
                false
            }
            None => false,
        }
    }

    /// Remove the subdir entry for `lower` if it still maps to `expected`.
    pub(crate) fn remove_subdir_entry(&self, lower: &str, expected: DirIndex) -> bool {
        let mut subdirs = self.subdirs.lock();
        match subdirs.get(lower) {
            Some(index) if *index == expected => {
                subdirs.remove(lower);
                true
            }
            _ => false,
        }
    }

    /// File entries in ascending case-insensitive name order.
    pub fn files_sorted(&self) -> Vec<(String, FileIndex)> {
        self.files
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    /// Subdirectory entries in ascending case-insensitive name order.
    pub fn subdirs_sorted(&self) -> Vec<(String, DirIndex)> {
        self.subdirs
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    /// Visit every file index, ascending by case-insensitive name.
    pub fn for_each_file(&self, mut f: impl FnMut(FileIndex)) {
        for (_, index) in self.files_sorted() {
            f(index);
        }
    }

    /// Visit every subdirectory index, ascending by case-insensitive name.
    pub fn for_each_subdirectory(&self, mut f: impl FnMut(DirIndex)) {
        for (_, index) in self.subdirs_sorted() {
            f(index);
        }
    }

    /// Number of files directly in this directory.
    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }

    /// Number of immediate subdirectories.
    pub fn subdir_count(&self) -> usize {
        self.subdirs.lock().len()
    }

    /// Whether the directory holds neither files nor subdirectories.
    pub fn is_empty(&self) -> bool {
        self.file_count() == 0 && self.subdir_count() == 0
    }

    /// Record that `origin` contributes somewhere in this subtree.
    pub(crate) fn add_origin(&self, origin: OriginId) {
        self.origins.lock().insert(origin);
    }

    /// Whether `origin` contributes anywhere in this subtree.
    pub fn has_origin(&self, origin: OriginId) -> bool {
        self.origins.lock().contains(&origin)
    }

    /// Every origin contributing anywhere in this subtree.
    pub fn origins(&self) -> Vec<OriginId> {
        self.origins.lock().iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_lookup_folds_case() {
        let node = DirectoryNode::new("Textures", None);
        let (idx, inserted) = node.file_entry_or_insert_with("rock.dds", || FileIndex(0));
        assert!(inserted);

        assert_eq!(node.file("ROCK.DDS"), Some(idx));
        assert_eq!(node.file("rock.dds"), Some(idx));
        assert_eq!(node.file_lower("rock.dds"), Some(idx));
        // The trusted fast path does not fold: mixed case misses.
        assert_eq!(node.file_lower("Rock.dds"), None);
    }

    #[test]
    fn test_entry_or_insert_is_idempotent() {
        let node = DirectoryNode::new("", None);
        let (first, inserted) = node.file_entry_or_insert_with("a.dds", || FileIndex(7));
        assert!(inserted);
        let (second, inserted) = node.file_entry_or_insert_with("a.dds", || FileIndex(99));
        assert!(!inserted);
        assert_eq!(first, second);
        assert_eq!(node.file_count(), 1);
    }

    #[test]
    fn test_remove_file_entry_checks_expected_index() {
        let node = DirectoryNode::new("", None);
        node.file_entry_or_insert_with("a.dds", || FileIndex(1));

        assert!(!node.remove_file_entry("a.dds", FileIndex(2)));
        assert_eq!(node.file_count(), 1);
        assert!(node.remove_file_entry("A.DDS", FileIndex(1)));
        assert_eq!(node.file_count(), 0);
        assert!(!node.remove_file_entry("a.dds", FileIndex(1)));
    }

    #[test]
    fn test_sorted_iteration_order() {
        let node = DirectoryNode::new("", None);
        node.file_entry_or_insert_with("zebra.nif", || FileIndex(0));
        node.file_entry_or_insert_with("apple.nif", || FileIndex(1));
        node.file_entry_or_insert_with("mango.nif", || FileIndex(2));

        let names: Vec<_> = node.files_sorted().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["apple.nif", "mango.nif", "zebra.nif"]);

        let mut visited = Vec::new();
        node.for_each_file(|i| visited.push(i));
        assert_eq!(visited, vec![FileIndex(1), FileIndex(2), FileIndex(0)]);
    }

    #[test]
    fn test_origin_tracking() {
        let node = DirectoryNode::new("", None);
        assert!(!node.has_origin(OriginId(1)));
        node.add_origin(OriginId(1));
        node.add_origin(OriginId(3));
        node.add_origin(OriginId(1));
        assert!(node.has_origin(OriginId(1)));
        assert_eq!(node.origins(), vec![OriginId(1), OriginId(3)]);
    }

    #[test]
    fn test_is_empty() {
        let node = DirectoryNode::new("", None);
        assert!(node.is_empty());
        node.subdir_entry_or_insert_with("meshes", || DirIndex(1));
        assert!(!node.is_empty());
        assert_eq!(node.subdir_count(), 1);
    }
}
