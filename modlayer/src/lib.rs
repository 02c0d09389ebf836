//! ModLayer - a conflict-resolving virtual merged filesystem.
//!
//! This library maintains a virtual merged view over a base game-data
//! directory and an ordered list of mod directories (and the archives
//! inside them). Each contributing source is an *origin*; origins are
//! totally ordered by priority. When the same relative path is provided
//! by more than one origin, the view deterministically exposes exactly
//! one winning file while remembering every losing alternative, so
//! conflicts can be inspected and re-resolved by priority re-ordering
//! without touching disk.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 GraphBuilder                 │
//! │                                              │
//! │  profile ─► worker pool ─► fresh Generation  │
//! │                │                             │
//! │   walk / archives / associated files         │
//! └───────────────┬──────────────────────────────┘
//!                 │ sort_all + prune, then swap
//!                 ▼
//! ┌──────────────────────────────────────────────┐
//! │           live Arc<Generation>               │
//! │                                              │
//! │  OriginRegistry · FileRegistry · Directory-  │
//! │  Tree, immutable once published              │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Published generations are never mutated; readers keep their snapshot
//! valid across later rebuilds while the replaced generation is torn
//! down on a background retirement thread.
//!
//! # Example
//!
//! ```no_run
//! use modlayer::builder::{GraphBuilder, RebuildSources};
//! use modlayer::config::{BuilderConfig, ModEntry, Profile};
//! use modlayer::walk::FsWalker;
//!
//! let profile = Profile {
//!     data_path: "/game/data".into(),
//!     plugins: vec!["ModA.esp".to_string()],
//!     mods: vec![ModEntry::new("ModA", "/mods/ModA", 1)],
//! };
//!
//! let builder = GraphBuilder::new(BuilderConfig::default());
//! let walker = FsWalker::new();
//! let generation = builder.rebuild(
//!     &profile,
//!     RebuildSources { walker: &walker, archives: None, load_order: None },
//! );
//!
//! for conflict in generation.conflicts() {
//!     println!("{} ({} losers)", conflict.relative_path, conflict.losers.len());
//! }
//! ```

pub mod archive;
pub mod builder;
pub mod config;
pub mod file;
pub mod generation;
pub mod loadorder;
pub mod origin;
pub mod paths;
pub mod telemetry;
pub mod tree;
pub mod walk;

pub use builder::{BuildPhase, GraphBuilder, ProgressSnapshot, RebuildSources};
pub use config::{BuilderConfig, ModEntry, Profile};
pub use file::{FileIndex, FileRecord, FileRegistry};
pub use generation::{ConflictReport, Generation};
pub use origin::{ArchiveRef, Origin, OriginId, OriginRef, OriginRegistry};
pub use tree::{DirIndex, DirectoryNode, DirectoryTree};
