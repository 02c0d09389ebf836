//! Plugin load-order boundary and archive name resolution.
//!
//! The game orders its plugin files externally; the core only uses that
//! order to rank multiple archives belonging to the same origin. Once per
//! rebuild the ordered plugin list is flattened into a
//! `basename (lowercased, no extension) → index` map, against which
//! archive names are resolved.

use tracing::warn;

use crate::paths::fold_case;

/// External source of the ordered plugin list.
pub trait LoadOrderProvider: Send + Sync {
    /// Plugin filenames in load order (e.g. `["Skyrim.esm", "ModA.esp"]`).
    fn plugin_names(&self) -> Vec<String>;
}

/// A fixed plugin list, for embedders that already hold the order.
#[derive(Debug, Clone, Default)]
pub struct StaticLoadOrder {
    plugins: Vec<String>,
}

impl StaticLoadOrder {
    /// Create from an ordered plugin list.
    pub fn new(plugins: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            plugins: plugins.into_iter().map(Into::into).collect(),
        }
    }
}

impl LoadOrderProvider for StaticLoadOrder {
    fn plugin_names(&self) -> Vec<String> {
        self.plugins.clone()
    }
}

/// Derived lookup map from plugin basenames to load-order indices.
///
/// Built once per rebuild from the provider's list.
#[derive(Debug, Clone, Default)]
pub struct LoadOrderMap {
    by_basename: std::collections::HashMap<String, usize>,
}

impl LoadOrderMap {
    /// Flatten a provider's ordered list into a basename map.
    ///
    /// The first occurrence of a basename wins.
    pub fn from_provider(provider: &dyn LoadOrderProvider) -> Self {
        let mut by_basename = std::collections::HashMap::new();
        for (index, name) in provider.plugin_names().iter().enumerate() {
            by_basename.entry(stem_lower(name)).or_insert(index);
        }
        Self { by_basename }
    }

    /// Number of distinct plugin basenames.
    pub fn len(&self) -> usize {
        self.by_basename.len()
    }

    /// Whether the map holds no plugins.
    pub fn is_empty(&self) -> bool {
        self.by_basename.is_empty()
    }

    /// Resolve an archive file name to its plugin's load-order index.
    ///
    /// Matches the archive basename first, then a `" - "`-truncated
    /// prefix (`"ModA - Textures.bsa"` falls back to `"moda"`). Unmatched
    /// archives get no load order and are logged; they still contribute
    /// files.
    pub fn resolve_archive(&self, archive_name: &str) -> Option<usize> {
        let stem = stem_lower(archive_name);
        if let Some(index) = self.by_basename.get(&stem) {
            return Some(*index);
        }
        if let Some(prefix) = stem.split(" - ").next() {
            if prefix != stem {
                if let Some(index) = self.by_basename.get(prefix) {
                    return Some(*index);
                }
            }
        }
        warn!(archive = archive_name, "archive matches no plugin in the load order");
        None
    }
}

/// Lowercased file stem (basename without the last extension).
fn stem_lower(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name);
    let stem = match base.rfind('.') {
        Some(dot) if dot > 0 => &base[..dot],
        _ => base,
    };
    fold_case(stem)
}
