//! CLI commands, one module per subcommand.

mod build;
mod conflicts;
mod tree;

pub use build::run_build;
pub use conflicts::run_conflicts;
pub use tree::run_tree;

use std::path::PathBuf;
use std::sync::Arc;

use modlayer::builder::{GraphBuilder, ProgressCallback, RebuildSources};
use modlayer::config::{BuilderConfig, Profile};
use modlayer::loadorder::StaticLoadOrder;
use modlayer::walk::FsWalker;
use modlayer::Generation;

use crate::error::CliError;

/// Resolve the profile path: explicit flag, `./modlayer.json`, or
/// `~/.modlayer/profile.json`.
pub fn resolve_profile_path(explicit: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let mut candidates = vec![PathBuf::from("modlayer.json")];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".modlayer").join("profile.json"));
    }
    for candidate in &candidates {
        if candidate.is_file() {
            return Ok(candidate.clone());
        }
    }
    Err(CliError::NoProfile(candidates))
}

/// Shared options controlling how a command rebuilds the view.
#[derive(Debug, Clone, clap::Args)]
pub struct RebuildOpts {
    /// Worker threads for the scan pool (default: all cores).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Skip archive entries entirely.
    #[arg(long)]
    pub no_archives: bool,
}

impl RebuildOpts {
    fn config(&self) -> BuilderConfig {
        let mut config = BuilderConfig::default().with_parse_archives(!self.no_archives);
        if let Some(threads) = self.threads {
            config = config.with_worker_threads(threads);
        }
        config
    }
}

/// Run one rebuild from the profile and return the published view.
///
/// The binary ships no archive parser (that collaborator is provided by
/// embedders), so archives contribute nothing here; loose files and
/// associated-file pseudo-mods are fully resolved.
pub fn rebuild(
    profile: &Profile,
    opts: &RebuildOpts,
    progress: Option<ProgressCallback>,
) -> (GraphBuilder, Arc<Generation>) {
    tracing::debug!(
        data = %profile.data_path.display(),
        mods = profile.mods.len(),
        "rebuilding merged view"
    );
    let builder = GraphBuilder::new(opts.config());
    let walker = FsWalker::new();
    let load_order = StaticLoadOrder::new(profile.plugins.clone());
    let generation = builder.rebuild_with_progress(
        profile,
        RebuildSources {
            walker: &walker,
            archives: None,
            load_order: Some(&load_order),
        },
        progress,
    );
    (builder, generation)
}

/// Render an origin claim as `name` or `name (archive)`.
pub fn describe_claim(generation: &Generation, claim: &modlayer::OriginRef) -> String {
    let name = generation
        .find_origin_by_id(claim.origin)
        .map(|o| o.name())
        .unwrap_or_else(|| claim.origin.to_string());
    match &claim.archive {
        Some(archive) => format!("{} ({})", name, archive.name),
        None => name,
    }
}
