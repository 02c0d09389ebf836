//! Archive-reader boundary.
//!
//! Parsing the game-archive binary format is an external collaborator's
//! job; the core only needs "given an archive, enumerate its folder tree,
//! and for each file: name, size, optional uncompressed size". The tree
//! types here are what that collaborator returns, plus an in-memory
//! reader so embedders and tests can supply archive contents without a
//! binary parser.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;

/// Errors from the archive-reader collaborator.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive file could not be opened.
    #[error("failed to open archive {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive contents could not be parsed.
    #[error("malformed archive {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// One file inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// File name within its folder.
    pub name: String,

    /// Stored (possibly compressed) size in bytes.
    pub size: u64,

    /// Uncompressed size; `None` means unknown or not compressed.
    pub uncompressed_size: Option<u64>,
}

impl ArchiveEntry {
    /// Create a new entry.
    pub fn new(name: impl Into<String>, size: u64, uncompressed_size: Option<u64>) -> Self {
        Self {
            name: name.into(),
            size,
            uncompressed_size,
        }
    }
}

/// One folder inside an archive.
#[derive(Debug, Clone, Default)]
pub struct ArchiveFolder {
    name: String,
    folders: Vec<ArchiveFolder>,
    files: Vec<ArchiveEntry>,
}

impl ArchiveFolder {
    /// Create an empty folder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            folders: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Folder name (one path component).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Immediate subfolders.
    pub fn folders(&self) -> &[ArchiveFolder] {
        &self.folders
    }

    /// Files directly in this folder.
    pub fn files(&self) -> &[ArchiveEntry] {
        &self.files
    }

    /// Add a subfolder, returning it for chained population.
    pub fn add_folder(&mut self, name: impl Into<String>) -> &mut ArchiveFolder {
        self.folders.push(ArchiveFolder::new(name));
        let last = self.folders.len() - 1;
        &mut self.folders[last]
    }

    /// Add a file to this folder.
    pub fn add_file(&mut self, entry: ArchiveEntry) -> &mut Self {
        self.files.push(entry);
        self
    }

    fn visit(&self, prefix: &str, f: &mut impl FnMut(&str, &ArchiveEntry)) {
        for entry in &self.files {
            let path = if prefix.is_empty() {
                entry.name.clone()
            } else {
                format!("{}/{}", prefix, entry.name)
            };
            f(&path, entry);
        }
        for folder in &self.folders {
            let child = if prefix.is_empty() {
                folder.name.clone()
            } else {
                format!("{}/{}", prefix, folder.name)
            };
            folder.visit(&child, f);
        }
    }
}

/// Root of an archive's folder tree.
#[derive(Debug, Clone, Default)]
pub struct ArchiveRoot {
    root: ArchiveFolder,
}

impl ArchiveRoot {
    /// Create an empty archive tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// The top-level folder (unnamed).
    pub fn root(&self) -> &ArchiveFolder {
        &self.root
    }

    /// Mutable access for population.
    pub fn root_mut(&mut self) -> &mut ArchiveFolder {
        &mut self.root
    }

    /// Visit every file with its archive-relative path.
    pub fn for_each_file(&self, mut f: impl FnMut(&str, &ArchiveEntry)) {
        self.root.visit("", &mut f);
    }

    /// Total number of files in the archive.
    pub fn file_count(&self) -> usize {
        let mut count = 0;
        self.for_each_file(|_, _| count += 1);
        count
    }
}

/// External archive-reader collaborator.
pub trait ArchiveReader: Send + Sync {
    /// Parse the archive at `path` into its folder tree.
    fn read(&self, path: &Path) -> Result<ArchiveRoot, ArchiveError>;
}

/// In-memory archive reader: a map from archive path to contents.
///
/// Registered trees are served by path; unknown paths report a malformed
/// archive, exercising the degraded-contribution path in the pipeline.
#[derive(Debug, Default)]
pub struct InMemoryArchives {
    archives: Mutex<HashMap<PathBuf, ArchiveRoot>>,
}

impl InMemoryArchives {
    /// Create an empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the contents served for `path`.
    pub fn insert(&self, path: impl Into<PathBuf>, root: ArchiveRoot) {
        self.archives.lock().insert(path.into(), root);
    }
}

impl ArchiveReader for InMemoryArchives {
    fn read(&self, path: &Path) -> Result<ArchiveRoot, ArchiveError> {
        self.archives
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| ArchiveError::Malformed {
                path: path.to_path_buf(),
                reason: "no contents registered for this path".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ArchiveRoot {
        let mut root = ArchiveRoot::new();
        root.root_mut()
            .add_file(ArchiveEntry::new("readme.txt", 10, None));
        let textures = root.root_mut().add_folder("textures");
        textures.add_file(ArchiveEntry::new("rock.dds", 2048, Some(4096)));
        textures
            .add_folder("landscape")
            .add_file(ArchiveEntry::new("grass.dds", 512, None));
        root
    }

    #[test]
    fn test_for_each_file_yields_relative_paths() {
        let root = sample();
        let mut paths = Vec::new();
        root.for_each_file(|path, _| paths.push(path.to_string()));
        paths.sort();
        assert_eq!(
            paths,
            vec![
                "readme.txt",
                "textures/landscape/grass.dds",
                "textures/rock.dds"
            ]
        );
    }

    #[test]
    fn test_file_count_and_sizes() {
        let root = sample();
        assert_eq!(root.file_count(), 3);

        let mut rock = None;
        root.for_each_file(|path, entry| {
            if path == "textures/rock.dds" {
                rock = Some(entry.clone());
            }
        });
        let rock = rock.unwrap();
        assert_eq!(rock.size, 2048);
        assert_eq!(rock.uncompressed_size, Some(4096));
    }

    #[test]
    fn test_in_memory_reader_roundtrip() {
        let reader = InMemoryArchives::new();
        reader.insert("/mods/ModA/ModA.bsa", sample());

        let root = reader.read(Path::new("/mods/ModA/ModA.bsa")).unwrap();
        assert_eq!(root.file_count(), 3);

        let err = reader.read(Path::new("/mods/ModA/missing.bsa")).unwrap_err();
        assert!(matches!(err, ArchiveError::Malformed { .. }));
    }

    #[test]
    fn test_empty_archive() {
        let root = ArchiveRoot::new();
        assert_eq!(root.file_count(), 0);
    }
}
