//! One immutable snapshot of the whole origin/file/directory graph.
//!
//! A generation is built privately by the rebuild pipeline and never
//! mutated after publication; readers holding an `Arc<Generation>` see a
//! fully-built, internally consistent graph for as long as they keep the
//! reference, even across later rebuilds.

use std::path::PathBuf;
use std::sync::Arc;

use crate::file::{FileIndex, FileRecord, FileRegistry};
use crate::origin::{Origin, OriginId, OriginRef, OriginRegistry};
use crate::paths::join_display;
use crate::tree::{DirIndex, DirectoryNode, DirectoryTree};

/// A conflicting file, reported with its winner and losers.
#[derive(Debug, Clone)]
pub struct ConflictReport {
    /// Path relative to the merged root, `/`-joined.
    pub relative_path: String,

    /// The record's stable index.
    pub index: FileIndex,

    /// The winning claim.
    pub winner: OriginRef,

    /// Losing claims, ascending by rank.
    pub losers: Vec<OriginRef>,
}

/// The `(OriginRegistry, FileRegistry, DirectoryTree)` triple.
pub struct Generation {
    origins: OriginRegistry,
    files: FileRegistry,
    tree: DirectoryTree,
}

impl Generation {
    /// Create an empty generation.
    pub fn new() -> Self {
        Self {
            origins: OriginRegistry::new(),
            files: FileRegistry::new(),
            tree: DirectoryTree::new(),
        }
    }

    /// The origin registry.
    pub fn origins(&self) -> &OriginRegistry {
        &self.origins
    }

    /// The file registry.
    pub fn files(&self) -> &FileRegistry {
        &self.files
    }

    /// The directory tree.
    pub fn tree(&self) -> &DirectoryTree {
        &self.tree
    }

    /// Root of the merged view.
    pub fn root(&self) -> Arc<DirectoryNode> {
        self.tree.root()
    }

    /// Look up an origin by id.
    pub fn find_origin_by_id(&self, id: OriginId) -> Option<Arc<Origin>> {
        self.origins.find_by_id(id)
    }

    /// Look up an origin by name.
    pub fn find_origin_by_name(&self, name: &str) -> Option<Arc<Origin>> {
        self.origins.find_by_name(name)
    }

    /// Whether an origin with the given name exists.
    pub fn origin_exists(&self, name: &str) -> bool {
        self.origins.origin_exists(name)
    }

    /// Resolve a file record by path (case-insensitive).
    pub fn find_file(&self, path: &str) -> Option<Arc<FileRecord>> {
        self.files.get(self.tree.find_file(path)?)
    }

    /// Resolve a directory node by path (case-insensitive).
    pub fn find_directory(&self, path: &str) -> Option<Arc<DirectoryNode>> {
        self.tree.node(self.tree.find_directory(path)?)
    }

    /// Path of a file relative to the merged root, `/`-joined.
    pub fn relative_path(&self, record: &FileRecord) -> String {
        let dir = self.tree.directory_path(record.parent());
        if dir.is_empty() {
            record.name().to_string()
        } else {
            join_display([dir.as_str(), record.name()])
        }
    }

    /// Full on-disk path of a file as provided by `origin`, or by the
    /// winning origin when `None`.
    ///
    /// For archived entries this is the path the file would occupy under
    /// the origin's directory; the archive itself is named by the claim's
    /// [`archive`](OriginRef::archive) field.
    pub fn full_path(&self, record: &FileRecord, origin: Option<OriginId>) -> Option<PathBuf> {
        let origin_id = match origin {
            Some(id) => id,
            None => record.primary()?.origin,
        };
        let origin = self.origins.find_by_id(origin_id)?;
        let mut path = origin.path().to_path_buf();
        for part in self.relative_path(record).split('/') {
            path.push(part);
        }
        Some(path)
    }

    /// Every conflicting file in the whole view.
    pub fn conflicts(&self) -> Vec<ConflictReport> {
        self.conflicts_under(self.tree.root_index())
    }

    /// Every conflicting file under the directory at `dir`, depth-first,
    /// entries of each directory ascending by case-insensitive name.
    pub fn conflicts_under(&self, dir: DirIndex) -> Vec<ConflictReport> {
        let mut reports = Vec::new();
        self.tree.for_each_file_recursive(dir, |_, index| {
            let Some(record) = self.files.get(index) else {
                return;
            };
            if !record.has_conflict() {
                return;
            }
            let Some(winner) = record.primary() else {
                return;
            };
            reports.push(ConflictReport {
                relative_path: self.relative_path(&record),
                index,
                winner,
                losers: record.alternatives(),
            });
        });
        reports
    }
}

impl Default for Generation {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generation")
            .field("origins", &self.origins.len())
            .field("files", &self.files.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn populated() -> Generation {
        let generation = Generation::new();
        let data = generation.origins.create("data", "/game/data", 0);
        let mod_a = generation.origins.create("ModA", "/mods/ModA", 1);

        for origin in [&data, &mod_a] {
            generation.tree.insert_path(
                origin,
                "textures/rock.dds",
                SystemTime::UNIX_EPOCH,
                None,
                &generation.files,
                &generation.origins,
            );
        }
        generation.tree.insert_path(
            &data,
            "meshes/chair.nif",
            SystemTime::UNIX_EPOCH,
            None,
            &generation.files,
            &generation.origins,
        );
        generation
    }

    #[test]
    fn test_find_file_and_relative_path() {
        let generation = populated();
        let record = generation.find_file("Textures/Rock.DDS").unwrap();
        assert_eq!(generation.relative_path(&record), "textures/rock.dds");
    }

    #[test]
    fn test_full_path_for_primary_and_explicit_origin() {
        let generation = populated();
        let record = generation.find_file("textures/rock.dds").unwrap();

        // ModA wins (priority 1 beats 0).
        let winning = generation.full_path(&record, None).unwrap();
        assert_eq!(winning, PathBuf::from("/mods/ModA/textures/rock.dds"));

        let data_id = generation.find_origin_by_name("data").unwrap().id();
        let losing = generation.full_path(&record, Some(data_id)).unwrap();
        assert_eq!(losing, PathBuf::from("/game/data/textures/rock.dds"));
    }

    #[test]
    fn test_conflicts_lists_only_contested_files() {
        let generation = populated();
        let conflicts = generation.conflicts();
        assert_eq!(conflicts.len(), 1);
        let report = &conflicts[0];
        assert_eq!(report.relative_path, "textures/rock.dds");
        let mod_a = generation.find_origin_by_name("ModA").unwrap().id();
        let data = generation.find_origin_by_name("data").unwrap().id();
        assert_eq!(report.winner.origin, mod_a);
        assert_eq!(report.losers.len(), 1);
        assert_eq!(report.losers[0].origin, data);
    }

    #[test]
    fn test_conflicts_under_subdirectory() {
        let generation = populated();
        let meshes = generation.tree.find_directory("meshes").unwrap();
        assert!(generation.conflicts_under(meshes).is_empty());
    }

    #[test]
    fn test_origin_lookups() {
        let generation = populated();
        assert!(generation.origin_exists("ModA"));
        assert!(!generation.origin_exists("ModB"));
        let id = generation.find_origin_by_name("data").unwrap().id();
        assert_eq!(generation.find_origin_by_id(id).unwrap().name(), "data");
    }

    #[test]
    fn test_empty_generation() {
        let generation = Generation::new();
        assert!(generation.files().is_empty());
        assert!(generation.conflicts().is_empty());
        assert!(generation.find_file("anything").is_none());
    }
}
