//! ModLayer CLI - inspect merged mod filesystems from the command line.
//!
//! A thin consumer of the `modlayer` read API: every command loads a
//! profile, runs one rebuild, and prints what the published generation
//! answers.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::RebuildOpts;

/// Merged-view inspector for prioritized mod sets.
#[derive(Debug, Parser)]
#[command(name = "modlayer", version, about)]
struct Cli {
    /// Profile file (default: ./modlayer.json, then ~/.modlayer/profile.json).
    #[arg(long, global = true)]
    profile: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rebuild the merged view and print a summary
    Build {
        #[command(flatten)]
        opts: RebuildOpts,
    },
    /// List conflicting files with winners and losers
    Conflicts {
        /// Restrict to one subdirectory of the merged view
        #[arg(long)]
        under: Option<String>,

        #[command(flatten)]
        opts: RebuildOpts,
    },
    /// Print a subtree listing with each file's winning origin
    Tree {
        /// Directory to start from (default: the merged root)
        start: Option<String>,

        /// Directory levels to descend
        #[arg(long, default_value_t = 3)]
        depth: usize,

        #[command(flatten)]
        opts: RebuildOpts,
    },
}

fn main() -> ExitCode {
    modlayer::telemetry::init_logging(Some("warn"));
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Build { opts } => commands::run_build(cli.profile.clone(), opts),
        Command::Conflicts { under, opts } => {
            commands::run_conflicts(cli.profile.clone(), under.clone(), opts)
        }
        Command::Tree { start, depth, opts } => {
            commands::run_tree(cli.profile.clone(), start.clone(), *depth, opts)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
