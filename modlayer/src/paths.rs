//! Relative-path splitting and case folding for the virtual tree.
//!
//! Virtual paths arrive from three places: on-disk directory walks, archive
//! listings, and consumer lookups. All three use the same splitting rules
//! (`/` and `\` are both separators, runs of separators collapse) and the
//! same case folding (Unicode lowercase), so both live here.

/// One component of a split relative path.
///
/// `last` marks the final component, which names a file in
/// [`insert_path`](crate::tree::DirectoryTree::insert_path) and is the only
/// component that may resolve to a file in lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathComponent<'a> {
    /// The component text, original case preserved.
    pub name: &'a str,

    /// Whether this is the final component of the path.
    pub last: bool,
}

/// Split a relative path on `/` and `\` separators.
///
/// Consecutive, leading, and trailing separators are no-op boundaries: an
/// empty or all-separator path yields no components at all.
///
/// # Example
///
/// ```
/// use modlayer::paths::split_components;
///
/// let parts = split_components(r"textures//rock\diffuse.dds");
/// assert_eq!(parts.len(), 3);
/// assert_eq!(parts[0].name, "textures");
/// assert_eq!(parts[2].name, "diffuse.dds");
/// assert!(parts[2].last);
/// assert!(!parts[0].last);
/// ```
pub fn split_components(path: &str) -> Vec<PathComponent<'_>> {
    let mut parts: Vec<PathComponent<'_>> = path
        .split(['/', '\\'])
        .filter(|c| !c.is_empty())
        .map(|name| PathComponent { name, last: false })
        .collect();
    if let Some(tail) = parts.last_mut() {
        tail.last = true;
    }
    parts
}

/// Fold a name to its canonical lookup key (Unicode lowercase).
///
/// The folded form is the key in every directory map; the original case is
/// retained separately for display.
pub fn fold_case(name: &str) -> String {
    name.to_lowercase()
}

/// Check whether a name is already in folded form.
///
/// Used by the pre-folded lookup fast paths to document (not enforce) their
/// contract: a mixed-case input simply misses the map.
pub fn is_folded(name: &str) -> bool {
    name == fold_case(name)
}

/// Join path components for display, using `/` on every platform.
pub fn join_display<I, S>(components: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for c in components {
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(c.as_ref());
    }
    out
}
