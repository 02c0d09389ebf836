//! `modlayer build`: rebuild the merged view and print a summary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use modlayer::builder::ProgressCallback;
use modlayer::config::Profile;

use super::{rebuild, resolve_profile_path, RebuildOpts};
use crate::error::CliError;

/// Run a full rebuild with a progress bar and print the result summary.
pub fn run_build(profile_path: Option<PathBuf>, opts: &RebuildOpts) -> Result<(), CliError> {
    let path = resolve_profile_path(profile_path)?;
    let profile = Profile::load(&path)?;
    println!(
        "Building merged view: {} + {} mods",
        profile.data_path.display(),
        profile.mods.len()
    );

    let bar = ProgressBar::new((profile.mods.len() + 1) as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let bar_sink = bar.clone();
    let callback: ProgressCallback = Arc::new(move |snapshot| {
        bar_sink.set_position(snapshot.done as u64);
    });

    let started = Instant::now();
    let (builder, generation) = rebuild(&profile, opts, Some(callback));
    bar.finish_and_clear();

    let metrics = builder.metrics();
    let conflicts = generation.conflicts();
    println!("Done in {:.2}s", started.elapsed().as_secs_f64());
    println!("  Origins:   {}", generation.origins().len());
    println!(
        "  Files:     {} ({} loose, {} archived)",
        generation.files().count(),
        metrics.loose_files,
        metrics.archive_files
    );
    println!("  Conflicts: {}", conflicts.len());
    if metrics.scan_errors > 0 {
        println!("  Warnings:  {} scan errors (see log)", metrics.scan_errors);
    }
    Ok(())
}
