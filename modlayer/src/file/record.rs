//! One logical file path and its conflict resolution.
//!
//! Every origin providing the path holds a claim on the record. Claims are
//! totally ordered by [`OriginRank`]: origin priority first, then "loose
//! beats archive" at equal priority. The maximum claim is the *primary*
//! (the file the merged view exposes); the rest are *alternatives*, kept
//! sorted ascending so conflicts can be inspected without re-ranking.

use std::time::SystemTime;

use parking_lot::Mutex;
use tracing::warn;

use super::FileIndex;
use crate::origin::{OriginId, OriginRef, OriginRegistry};
use crate::tree::DirIndex;

/// Sort key of one origin's claim on a file.
///
/// Lexicographic ascending order; the maximum wins. At equal priority a
/// loose file outranks an archived one. Two loose claims, or two archived
/// claims from the same origin, compare equal: their relative order is the
/// insertion order and intentionally left unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OriginRank {
    /// Priority of the owning origin.
    pub priority: i32,

    /// `true` for loose files, which outrank archived ones.
    pub loose: bool,
}

impl OriginRank {
    /// Rank a claim against the origins in `registry`.
    pub fn of(claim: &OriginRef, registry: &OriginRegistry) -> Self {
        Self {
            priority: registry.priority_of(claim.origin),
            loose: claim.is_loose(),
        }
    }
}

#[derive(Debug)]
struct ConflictState {
    primary: Option<OriginRef>,
    /// Losing claims, sorted ascending by rank.
    alternatives: Vec<OriginRef>,
    /// Last-write time reported for the current primary.
    last_write: SystemTime,
}

impl ConflictState {
    /// Drop any existing claim with the same identity as `claim`
    /// (same origin and same archive name), so a re-insert updates it.
    fn drop_identity(&mut self, claim: &OriginRef) {
        let same = |r: &OriginRef| {
            r.origin == claim.origin
                && r.archive.as_ref().map(|a| a.name.as_str())
                    == claim.archive.as_ref().map(|a| a.name.as_str())
        };
        if self.primary.as_ref().is_some_and(&same) {
            self.primary = self.alternatives.pop();
        }
        self.alternatives.retain(|r| !same(r));
    }

    /// Insert a losing claim at its sorted position.
    ///
    /// Equal ranks insert after existing ones, preserving insertion order.
    fn insert_alternative(&mut self, claim: OriginRef, registry: &OriginRegistry) {
        let rank = OriginRank::of(&claim, registry);
        let at = self
            .alternatives
            .partition_point(|a| OriginRank::of(a, registry) <= rank);
        self.alternatives.insert(at, claim);
    }
}

/// One logical file path in the merged view.
///
/// The record itself never detaches from its parent directory or registry
/// slot; callers react to [`remove_origin`](FileRecord::remove_origin)
/// returning `true` (last origin gone) and cascade the removal.
#[derive(Debug)]
pub struct FileRecord {
    index: FileIndex,
    name: String,
    parent: DirIndex,
    state: Mutex<ConflictState>,
}

impl FileRecord {
    pub(crate) fn new(index: FileIndex, name: impl Into<String>, parent: DirIndex) -> Self {
        Self {
            index,
            name: name.into(),
            parent,
            state: Mutex::new(ConflictState {
                primary: None,
                alternatives: Vec::new(),
                last_write: SystemTime::UNIX_EPOCH,
            }),
        }
    }

    /// The record's stable index.
    pub fn index(&self) -> FileIndex {
        self.index
    }

    /// File name, original case preserved.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index of the directory node containing this file.
    pub fn parent(&self) -> DirIndex {
        self.parent
    }

    /// Add (or refresh) an origin's claim on this file.
    ///
    /// The very first claim becomes primary unconditionally. Later claims
    /// either demote the current primary (candidate ranks higher) or join
    /// the alternatives at their sorted position.
    pub fn add_origin(
        &self,
        claim: OriginRef,
        write_time: SystemTime,
        registry: &OriginRegistry,
    ) {
        let mut state = self.state.lock();
        state.drop_identity(&claim);

        match state.primary.take() {
            None => {
                state.primary = Some(claim);
                state.last_write = write_time;
            }
            Some(current) => {
                let candidate_rank = OriginRank::of(&claim, registry);
                let current_rank = OriginRank::of(&current, registry);
                if candidate_rank > current_rank {
                    state.insert_alternative(current, registry);
                    state.primary = Some(claim);
                    state.last_write = write_time;
                } else {
                    state.primary = Some(current);
                    state.insert_alternative(claim, registry);
                }
            }
        }
    }

    /// Remove every claim the given origin holds on this file.
    ///
    /// Returns `true` iff this was the file's last origin; the caller must
    /// then detach the record from its directory and registry. When the
    /// primary is removed and alternatives remain, the highest-ranked
    /// alternative is promoted.
    pub fn remove_origin(&self, origin: OriginId) -> bool {
        let mut state = self.state.lock();

        let before = state.alternatives.len() + usize::from(state.primary.is_some());
        state.alternatives.retain(|r| r.origin != origin);
        if state.primary.as_ref().is_some_and(|p| p.origin == origin) {
            // Alternatives are sorted ascending, so the promotion candidate
            // is the last one.
            state.primary = state.alternatives.pop();
        }
        let after = state.alternatives.len() + usize::from(state.primary.is_some());

        if before == after {
            warn!(file = %self.index, %origin, "remove_origin: origin holds no claim on this file");
        }
        state.primary.is_none()
    }

    /// Re-evaluate the full ordering of all claims and re-pick the primary.
    ///
    /// Must be called after origin *priorities* change (the usual case:
    /// once per rebuild, after all workers finish), because such changes
    /// are not propagated into every record automatically.
    pub fn sort_origins(&self, registry: &OriginRegistry) {
        let mut state = self.state.lock();
        let mut claims = std::mem::take(&mut state.alternatives);
        if let Some(primary) = state.primary.take() {
            claims.push(primary);
        }
        // Stable sort keeps insertion order among equal ranks.
        claims.sort_by_key(|c| OriginRank::of(c, registry));
        state.primary = claims.pop();
        state.alternatives = claims;
    }

    /// The currently winning claim, if any origin provides this file.
    pub fn primary(&self) -> Option<OriginRef> {
        self.state.lock().primary.clone()
    }

    /// Losing claims, ascending by rank.
    pub fn alternatives(&self) -> Vec<OriginRef> {
        self.state.lock().alternatives.clone()
    }

    /// Ids of every origin providing this file (primary first, deduplicated).
    pub fn origins(&self) -> Vec<OriginId> {
        let state = self.state.lock();
        let mut ids = Vec::with_capacity(state.alternatives.len() + 1);
        if let Some(p) = &state.primary {
            ids.push(p.origin);
        }
        for alt in state.alternatives.iter().rev() {
            if !ids.contains(&alt.origin) {
                ids.push(alt.origin);
            }
        }
        ids
    }

    /// Whether the given origin provides this file.
    pub fn is_provided_by(&self, origin: OriginId) -> bool {
        let state = self.state.lock();
        state.primary.as_ref().is_some_and(|p| p.origin == origin)
            || state.alternatives.iter().any(|a| a.origin == origin)
    }

    /// Total number of claims (primary plus alternatives).
    pub fn provider_count(&self) -> usize {
        let state = self.state.lock();
        state.alternatives.len() + usize::from(state.primary.is_some())
    }

    /// Whether more than one origin provides this file.
    pub fn has_conflict(&self) -> bool {
        !self.state.lock().alternatives.is_empty()
    }

    /// Whether no origin provides this file.
    pub fn is_orphan(&self) -> bool {
        self.state.lock().primary.is_none()
    }

    /// Whether the winning entry comes from an archive.
    pub fn is_from_archive(&self) -> bool {
        self.state
            .lock()
            .primary
            .as_ref()
            .is_some_and(|p| !p.is_loose())
    }

    /// Last-write time reported when the current primary claimed the file.
    pub fn last_write(&self) -> SystemTime {
        self.state.lock().last_write
    }
}
