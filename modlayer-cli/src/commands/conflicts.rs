//! `modlayer conflicts`: list contested files with winners and losers.

use std::path::PathBuf;

use modlayer::config::Profile;

use super::{describe_claim, rebuild, resolve_profile_path, RebuildOpts};
use crate::error::CliError;

/// Rebuild the view and print every conflict, optionally under one
/// subdirectory.
pub fn run_conflicts(
    profile_path: Option<PathBuf>,
    under: Option<String>,
    opts: &RebuildOpts,
) -> Result<(), CliError> {
    let path = resolve_profile_path(profile_path)?;
    let profile = Profile::load(&path)?;
    let (_builder, generation) = rebuild(&profile, opts, None);

    let reports = match &under {
        Some(dir) => {
            let index = generation
                .tree()
                .find_directory(dir)
                .ok_or_else(|| CliError::PathNotFound(dir.clone()))?;
            generation.conflicts_under(index)
        }
        None => generation.conflicts(),
    };

    if reports.is_empty() {
        println!("No conflicts.");
        return Ok(());
    }

    println!("{} conflicting file(s):", reports.len());
    for report in &reports {
        println!("  {}", report.relative_path);
        println!("    winner: {}", describe_claim(&generation, &report.winner));
        // Losers are stored ascending; show strongest first.
        for loser in report.losers.iter().rev() {
            println!("    loser:  {}", describe_claim(&generation, loser));
        }
    }
    Ok(())
}
