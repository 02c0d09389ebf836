//! The merged directory tree of one generation.
//!
//! Nodes live in a generation-owned arena and address each other by
//! [`DirIndex`], so parent links can never dangle. The arena only grows;
//! pruned subtrees leave unreferenced slots behind, the same
//! holes-persist policy the file registry uses for index stability.
//!
//! Lock ordering: node map locks may be held while the arena or the file
//! registry's slot lock is taken (both are leaf locks that never acquire
//! anything else). The arena lock is never held across node-map access:
//! [`DirectoryTree::node`] clones the `Arc` and releases immediately.

mod node;

pub use node::DirectoryNode;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::file::{FileIndex, FileRecord, FileRegistry};
use crate::origin::{ArchiveRef, Origin, OriginRef, OriginRegistry};
use crate::paths::{fold_case, split_components};

/// Index of a [`DirectoryNode`] in its generation's arena.
///
/// Valid only for the lifetime of the generation that allocated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DirIndex(pub(crate) u32);

impl DirIndex {
    /// Raw numeric value, for logging and display.
    pub fn value(&self) -> u32 {
        self.0
    }

    fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for DirIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dir#{}", self.0)
    }
}

/// Hierarchical namespace of the merged view, rooted at the data directory.
pub struct DirectoryTree {
    nodes: RwLock<Vec<Arc<DirectoryNode>>>,
}

impl DirectoryTree {
    /// Create a tree holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(vec![Arc::new(DirectoryNode::new("", None))]),
        }
    }

    /// Index of the root node.
    pub fn root_index(&self) -> DirIndex {
        DirIndex(0)
    }

    /// The root node, representing the merged data directory.
    pub fn root(&self) -> Arc<DirectoryNode> {
        Arc::clone(&self.nodes.read()[0])
    }

    /// Resolve a node by index.
    ///
    /// Out-of-range indices indicate a stale handle from another
    /// generation; logged, never fatal.
    pub fn node(&self, index: DirIndex) -> Option<Arc<DirectoryNode>> {
        let nodes = self.nodes.read();
        match nodes.get(index.as_usize()) {
            Some(node) => Some(Arc::clone(node)),
            None => {
                warn!(%index, len = nodes.len(), "directory index out of range");
                None
            }
        }
    }

    /// Number of arena slots, including slots orphaned by pruning.
    pub fn arena_len(&self) -> usize {
        self.nodes.read().len()
    }

    fn push_node(&self, name: &str, parent: DirIndex) -> DirIndex {
        let mut nodes = self.nodes.write();
        let index = DirIndex(nodes.len() as u32);
        nodes.push(Arc::new(DirectoryNode::new(name, Some(parent))));
        index
    }

    /// Fetch-or-create the subdirectory `name` under `parent`.
    fn ensure_subdir(&self, parent: DirIndex, name: &str) -> Option<DirIndex> {
        let parent_node = self.node(parent)?;
        let lower = fold_case(name);
        let (index, _) =
            parent_node.subdir_entry_or_insert_with(&lower, || self.push_node(name, parent));
        Some(index)
    }

    /// Insert one file contributed by `origin` at `relative_path`.
    ///
    /// Splits the path on `/` and `\` (runs of separators collapse; an
    /// empty or all-separator path inserts nothing), creates intermediate
    /// directories on demand, creates-or-fetches the file record for the
    /// final component and adds the origin's claim to it. The origin id
    /// is propagated into every ancestor's origin set up to the root.
    pub fn insert_path(
        &self,
        origin: &Origin,
        relative_path: &str,
        write_time: SystemTime,
        archive: Option<ArchiveRef>,
        files: &FileRegistry,
        origins: &OriginRegistry,
    ) -> Option<Arc<FileRecord>> {
        let components = split_components(relative_path);
        if components.is_empty() {
            debug!(path = relative_path, "insert of empty path ignored");
            return None;
        }

        let mut current = self.root_index();
        self.root().add_origin(origin.id());

        for component in components {
            if !component.last {
                current = self.ensure_subdir(current, component.name)?;
                self.node(current)?.add_origin(origin.id());
                continue;
            }

            let parent_node = self.node(current)?;
            let lower = fold_case(component.name);
            let (index, _created) = parent_node
                .file_entry_or_insert_with(&lower, || files.create(component.name, current).index());
            let record = files.get(index)?;
            let claim = match archive {
                Some(archive) => OriginRef::archived(origin.id(), archive),
                None => OriginRef::loose(origin.id()),
            };
            record.add_origin(claim, write_time, origins);
            origin.add_file(index);
            return Some(record);
        }
        None
    }

    /// Resolve a directory by path, folding case.
    ///
    /// An empty path resolves to the root ("self").
    pub fn find_directory(&self, path: &str) -> Option<DirIndex> {
        self.descend(path, |node, name| node.subdir(name))
    }

    /// Resolve a directory by an already-folded path.
    pub fn find_directory_lower(&self, path: &str) -> Option<DirIndex> {
        self.descend(path, |node, name| node.subdir_lower(name))
    }

    fn descend(
        &self,
        path: &str,
        lookup: impl Fn(&DirectoryNode, &str) -> Option<DirIndex>,
    ) -> Option<DirIndex> {
        let mut current = self.root_index();
        for component in split_components(path) {
            let node = self.node(current)?;
            current = lookup(&node, component.name)?;
        }
        Some(current)
    }

    /// Resolve a file by path, folding case.
    ///
    /// A file lookup requires at least one component: the empty path is
    /// "not found".
    pub fn find_file(&self, path: &str) -> Option<FileIndex> {
        self.find_file_with(path, |node, name| node.subdir(name), |node, name| node.file(name))
    }

    /// Resolve a file by an already-folded path.
    ///
    /// Hot-path variant for recursive conflict scans and tooltip queries;
    /// a mixed-case input simply misses.
    pub fn find_file_lower(&self, path: &str) -> Option<FileIndex> {
        self.find_file_with(
            path,
            |node, name| node.subdir_lower(name),
            |node, name| node.file_lower(name),
        )
    }

    fn find_file_with(
        &self,
        path: &str,
        dir_lookup: impl Fn(&DirectoryNode, &str) -> Option<DirIndex>,
        file_lookup: impl Fn(&DirectoryNode, &str) -> Option<FileIndex>,
    ) -> Option<FileIndex> {
        let mut current = self.root_index();
        for component in split_components(path) {
            let node = self.node(current)?;
            if component.last {
                return file_lookup(&node, component.name);
            }
            current = dir_lookup(&node, component.name)?;
        }
        None
    }

    /// Remove the file entry for `name` from the directory at `parent`,
    /// provided it still maps to `index`.
    pub(crate) fn detach_file(&self, parent: DirIndex, name: &str, index: FileIndex) {
        if let Some(node) = self.node(parent) {
            node.remove_file_entry(name, index);
        }
    }

    /// Visit every file under `from` (inclusive), depth-first, files of
    /// each directory in ascending case-insensitive name order.
    pub fn for_each_file_recursive(&self, from: DirIndex, mut f: impl FnMut(DirIndex, FileIndex)) {
        let mut stack = vec![from];
        while let Some(dir) = stack.pop() {
            let Some(node) = self.node(dir) else { continue };
            node.for_each_file(|index| f(dir, index));
            // Reverse push keeps subdirectory visit order ascending.
            let mut subdirs = node.subdirs_sorted();
            subdirs.reverse();
            for (_, index) in subdirs {
                stack.push(index);
            }
        }
    }

    /// Display path of a directory relative to the root, `/`-joined.
    pub fn directory_path(&self, index: DirIndex) -> String {
        let mut parts = Vec::new();
        let mut current = Some(index);
        while let Some(dir) = current {
            let Some(node) = self.node(dir) else { break };
            if !node.is_root() {
                parts.push(node.name().to_string());
            }
            current = node.parent();
        }
        parts.reverse();
        crate::paths::join_display(parts)
    }

    /// Remove files and directories known not to matter to the consumer
    /// (editor metadata and the like). Purely a filter: no
    /// conflict-resolution semantics.
    ///
    /// `prune_files` and `prune_dirs` are matched case-insensitively
    /// against entry names. Returns `(files_removed, dirs_removed)`.
    pub fn prune_irrelevant(
        &self,
        files: &FileRegistry,
        origins: &OriginRegistry,
        prune_files: &[String],
        prune_dirs: &[String],
    ) -> (usize, usize) {
        let file_names: HashSet<String> = prune_files.iter().map(|n| fold_case(n)).collect();
        let dir_names: HashSet<String> = prune_dirs.iter().map(|n| fold_case(n)).collect();

        let mut files_removed = 0usize;
        let mut dirs_removed = 0usize;
        let mut stack = vec![self.root_index()];
        while let Some(dir) = stack.pop() {
            let Some(node) = self.node(dir) else { continue };

            for (name, index) in node.files_sorted() {
                if file_names.contains(&name) {
                    files.remove(index, origins, self);
                    files_removed += 1;
                }
            }
            for (name, index) in node.subdirs_sorted() {
                if dir_names.contains(&name) {
                    files_removed += self.remove_subtree(index, files, origins);
                    node.remove_subdir_entry(&name, index);
                    dirs_removed += 1;
                } else {
                    stack.push(index);
                }
            }
        }

        if files_removed > 0 || dirs_removed > 0 {
            debug!(files_removed, dirs_removed, "pruned irrelevant entries");
        }
        (files_removed, dirs_removed)
    }

    /// Remove every file in the subtree at `dir` from the registry.
    ///
    /// The node slots themselves stay in the arena as orphans.
    fn remove_subtree(&self, dir: DirIndex, files: &FileRegistry, origins: &OriginRegistry) -> usize {
        let mut removed = 0usize;
        let mut stack = vec![dir];
        while let Some(current) = stack.pop() {
            let Some(node) = self.node(current) else { continue };
            for (_, index) in node.files_sorted() {
                files.remove(index, origins, self);
                removed += 1;
            }
            for (_, index) in node.subdirs_sorted() {
                stack.push(index);
            }
        }
        removed
    }
}

impl Default for DirectoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DirectoryTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryTree")
            .field("arena_len", &self.arena_len())
            .finish()
    }
}
