//! Directory-enumeration boundary.
//!
//! The rebuild pipeline only needs "for each entry under a root, report
//! subdirectory-enter, subdirectory-leave, and file(name, last-write-time)
//! events, in document order". The OS-specific high-throughput walker is
//! an external collaborator behind [`DirectoryWalker`]; [`FsWalker`] is
//! the portable default built on `std::fs::read_dir`.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use tracing::warn;

/// Errors that abort a directory walk at the root.
///
/// Failures on individual entries never abort: they are skipped and
/// logged by the walker.
#[derive(Debug, Error)]
pub enum WalkError {
    /// The walk root does not exist or is not a directory.
    #[error("walk root is not a directory: {0}")]
    RootNotFound(PathBuf),

    /// The walk root could not be opened.
    #[error("failed to enumerate {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Receiver of walk events.
///
/// Paths are reported relative to the walk root. Events arrive in
/// document order, depth-first, synchronously on the calling thread.
pub trait WalkVisitor {
    /// A subdirectory is being entered.
    fn enter_directory(&mut self, relative: &Path);

    /// The subdirectory reported by the matching enter is done.
    fn leave_directory(&mut self, relative: &Path);

    /// A file with its last-write time.
    fn file(&mut self, relative: &Path, last_write: SystemTime);
}

/// External directory-enumeration collaborator.
pub trait DirectoryWalker: Send + Sync {
    /// Walk `root` recursively, reporting every entry to `visitor`.
    ///
    /// Individual unreadable entries are skipped and logged; only a
    /// failure at the root itself is an error.
    fn walk(&self, root: &Path, visitor: &mut dyn WalkVisitor) -> Result<(), WalkError>;
}

/// Portable recursive walker over `std::fs`.
///
/// Entry order within a directory is whatever the OS reports; the core
/// sorts at read time, so no ordering is imposed here.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsWalker;

impl FsWalker {
    /// Create a new walker.
    pub fn new() -> Self {
        Self
    }

    fn walk_dir(
        &self,
        absolute: &Path,
        relative: &Path,
        visitor: &mut dyn WalkVisitor,
    ) -> Result<(), WalkError> {
        let entries = std::fs::read_dir(absolute).map_err(|source| WalkError::Io {
            path: absolute.to_path_buf(),
            source,
        })?;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %absolute.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let absolute_child = entry.path();
            let relative_child = relative.join(entry.file_name());

            if absolute_child.is_dir() {
                visitor.enter_directory(&relative_child);
                // A subtree failing to open degrades to an empty subtree.
                if let Err(e) = self.walk_dir(&absolute_child, &relative_child, visitor) {
                    warn!(dir = %absolute_child.display(), error = %e, "skipping unreadable subtree");
                }
                visitor.leave_directory(&relative_child);
            } else {
                let last_write = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                visitor.file(&relative_child, last_write);
            }
        }
        Ok(())
    }
}

impl DirectoryWalker for FsWalker {
    fn walk(&self, root: &Path, visitor: &mut dyn WalkVisitor) -> Result<(), WalkError> {
        if !root.is_dir() {
            return Err(WalkError::RootNotFound(root.to_path_buf()));
        }
        self.walk_dir(root, Path::new(""), visitor)
    }
}
