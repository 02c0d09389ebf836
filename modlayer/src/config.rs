//! Rebuild configuration: the active-mod profile and builder tuning.
//!
//! Nothing here is ambient: the base data path and the plugin load order
//! travel with the profile, and the builder receives everything through
//! explicit configuration.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading or validating a profile file.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The profile file could not be read.
    #[error("failed to read profile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The profile file is not valid JSON.
    #[error("failed to parse profile {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The profile content is inconsistent.
    #[error("invalid profile: {0}")]
    Invalid(String),
}

/// A file already counted under another origin, re-parented to a
/// pseudo-mod instead of re-scanned from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociatedFile {
    /// Path relative to the merged data root.
    pub relative_path: String,

    /// Last-write time, when known.
    #[serde(default)]
    pub last_write: Option<SystemTime>,
}

impl AssociatedFile {
    /// Create an associated-file entry.
    pub fn new(relative_path: impl Into<String>, last_write: Option<SystemTime>) -> Self {
        Self {
            relative_path: relative_path.into(),
            last_write,
        }
    }
}

/// One active mod handed to the rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModEntry {
    /// Origin name for this mod.
    pub name: String,

    /// The mod's own directory.
    pub path: PathBuf,

    /// Conflict priority; higher wins.
    pub priority: i32,

    /// Archives belonging to this mod.
    #[serde(default)]
    pub archives: Vec<PathBuf>,

    /// When non-empty, these files are re-parented to this origin instead
    /// of scanning `path` (the pseudo-mod case).
    #[serde(default)]
    pub associated_files: Vec<AssociatedFile>,
}

impl ModEntry {
    /// Create a plain mod entry (no archives, no associated files).
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, priority: i32) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            priority,
            archives: Vec::new(),
            associated_files: Vec::new(),
        }
    }

    /// Attach archives to this entry.
    pub fn with_archives(mut self, archives: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.archives = archives.into_iter().map(Into::into).collect();
        self
    }

    /// Attach an associated-files list, marking this entry a pseudo-mod.
    pub fn with_associated_files(
        mut self,
        files: impl IntoIterator<Item = AssociatedFile>,
    ) -> Self {
        self.associated_files = files.into_iter().collect();
        self
    }
}

/// The active-mod list plus everything the rebuild needs to resolve it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Base game data directory (the lowest-priority origin).
    pub data_path: PathBuf,

    /// Plugin filenames in load order, used to rank archives.
    #[serde(default)]
    pub plugins: Vec<String>,

    /// Active mods. Order is informational; priorities decide conflicts.
    pub mods: Vec<ModEntry>,
}

impl Profile {
    /// Load a profile from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let profile: Profile =
            serde_json::from_str(&text).map_err(|source| ProfileError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        profile.validate()?;
        Ok(profile)
    }

    /// Check internal consistency: mod names must be unique.
    pub fn validate(&self) -> Result<(), ProfileError> {
        let mut seen = std::collections::HashSet::new();
        for entry in &self.mods {
            if entry.name.trim().is_empty() {
                return Err(ProfileError::Invalid("mod with empty name".to_string()));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(ProfileError::Invalid(format!(
                    "duplicate mod name: {}",
                    entry.name
                )));
            }
        }
        Ok(())
    }
}

/// Default origin name for the base game data.
pub const DEFAULT_DATA_ORIGIN_NAME: &str = "data";

/// Default priority of the base game data (the baseline every mod beats).
pub const DEFAULT_DATA_ORIGIN_PRIORITY: i32 = 0;

/// File names pruned from every rebuilt tree by default.
pub const DEFAULT_PRUNE_FILES: &[&str] = &["meta.ini", "thumbs.db", "desktop.ini"];

/// Directory names pruned from every rebuilt tree by default.
pub const DEFAULT_PRUNE_DIRS: &[&str] = &[".git", ".svn"];

/// Tuning for the rebuild pipeline.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Worker threads for the scan pool. `1` scans strictly serially.
    pub worker_threads: usize,

    /// Whether archives listed on mod entries are opened at all.
    pub parse_archives: bool,

    /// Origin name given to the base data directory.
    pub data_origin_name: String,

    /// Priority of the base data origin.
    pub data_origin_priority: i32,

    /// File names filtered out of the finished tree.
    pub prune_files: Vec<String>,

    /// Directory names filtered out of the finished tree.
    pub prune_dirs: Vec<String>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            parse_archives: true,
            data_origin_name: DEFAULT_DATA_ORIGIN_NAME.to_string(),
            data_origin_priority: DEFAULT_DATA_ORIGIN_PRIORITY,
            prune_files: DEFAULT_PRUNE_FILES.iter().map(|s| s.to_string()).collect(),
            prune_dirs: DEFAULT_PRUNE_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl BuilderConfig {
    /// Set the worker thread count (clamped to at least one).
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }

    /// Enable or disable archive parsing.
    pub fn with_parse_archives(mut self, parse: bool) -> Self {
        self.parse_archives = parse;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_profile_roundtrip_json() {
        let profile = Profile {
            data_path: PathBuf::from("/game/data"),
            plugins: vec!["Skyrim.esm".to_string(), "ModA.esp".to_string()],
            mods: vec![
                ModEntry::new("ModA", "/mods/ModA", 1).with_archives(["/mods/ModA/ModA.bsa"]),
                ModEntry::new("overwrite", "/mods/overwrite", 99).with_associated_files([
                    AssociatedFile::new("textures/generated.dds", None),
                ]),
            ],
        };

        let json = serde_json::to_string_pretty(&profile).unwrap();
        let parsed: Profile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.data_path, profile.data_path);
        assert_eq!(parsed.mods.len(), 2);
        assert_eq!(parsed.mods[0].archives.len(), 1);
        assert_eq!(parsed.mods[1].associated_files.len(), 1);
    }

    #[test]
    fn test_profile_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("profile.json");
        std::fs::write(
            &path,
            r#"{
                "data_path": "/game/data",
                "mods": [
                    {"name": "ModA", "path": "/mods/ModA", "priority": 1}
                ]
            }"#,
        )
        .unwrap();

        let profile = Profile::load(&path).unwrap();
        assert_eq!(profile.mods.len(), 1);
        assert!(profile.plugins.is_empty());
        assert_eq!(profile.mods[0].priority, 1);
    }

    #[test]
    fn test_profile_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = Profile::load(&temp.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ProfileError::Io { .. }));
    }

    #[test]
    fn test_profile_load_bad_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("profile.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = Profile::load(&path).unwrap_err();
        assert!(matches!(err, ProfileError::Parse { .. }));
    }

    #[test]
    fn test_profile_validate_duplicate_names() {
        let profile = Profile {
            data_path: PathBuf::from("/game/data"),
            plugins: Vec::new(),
            mods: vec![
                ModEntry::new("ModA", "/a", 1),
                ModEntry::new("ModA", "/b", 2),
            ],
        };
        let err = profile.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate mod name"));
    }

    #[test]
    fn test_profile_validate_empty_name() {
        let profile = Profile {
            data_path: PathBuf::from("/game/data"),
            plugins: Vec::new(),
            mods: vec![ModEntry::new("  ", "/a", 1)],
        };
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_builder_config_default() {
        let config = BuilderConfig::default();
        assert!(config.worker_threads >= 1);
        assert!(config.parse_archives);
        assert_eq!(config.data_origin_name, "data");
        assert!(config.prune_files.contains(&"meta.ini".to_string()));
    }

    #[test]
    fn test_builder_config_with_helpers() {
        let config = BuilderConfig::default()
            .with_worker_threads(0)
            .with_parse_archives(false);
        assert_eq!(config.worker_threads, 1);
        assert!(!config.parse_archives);
    }
}
