//! `modlayer tree`: print a subtree with each file's winning origin.

use std::path::PathBuf;

use modlayer::config::Profile;
use modlayer::tree::DirIndex;
use modlayer::Generation;

use super::{describe_claim, rebuild, resolve_profile_path, RebuildOpts};
use crate::error::CliError;

/// Rebuild the view and print the listing under `start` (root when
/// omitted), limited to `depth` directory levels.
pub fn run_tree(
    profile_path: Option<PathBuf>,
    start: Option<String>,
    depth: usize,
    opts: &RebuildOpts,
) -> Result<(), CliError> {
    let path = resolve_profile_path(profile_path)?;
    let profile = Profile::load(&path)?;
    let (_builder, generation) = rebuild(&profile, opts, None);

    let start_index = match &start {
        Some(dir) => generation
            .tree()
            .find_directory(dir)
            .ok_or_else(|| CliError::PathNotFound(dir.clone()))?,
        None => generation.tree().root_index(),
    };

    print_dir(&generation, start_index, 0, depth);
    Ok(())
}

fn print_dir(generation: &Generation, dir: DirIndex, level: usize, max_depth: usize) {
    let Some(node) = generation.tree().node(dir) else {
        return;
    };
    let indent = "  ".repeat(level);

    node.for_each_file(|index| {
        let Some(record) = generation.files().get(index) else {
            return;
        };
        let provenance = match record.primary() {
            Some(claim) => describe_claim(generation, &claim),
            None => "<unresolved>".to_string(),
        };
        let marker = if record.has_conflict() { "*" } else { " " };
        println!("{}{} {}  [{}]", indent, marker, record.name(), provenance);
    });

    if level >= max_depth {
        if node.subdir_count() > 0 {
            println!("{}… {} more directorie(s)", indent, node.subdir_count());
        }
        return;
    }
    node.for_each_subdirectory(|subdir| {
        if let Some(child) = generation.tree().node(subdir) {
            println!("{}{}/", indent, child.name());
        }
        print_dir(generation, subdir, level + 1, max_depth);
    });
}
