//! CLI error type.

use std::path::PathBuf;

use modlayer::config::ProfileError;
use thiserror::Error;

/// Errors surfaced to the terminal user.
#[derive(Debug, Error)]
pub enum CliError {
    /// The profile file could not be loaded.
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// No profile file was found at any candidate location.
    #[error("no profile found; looked at {0:?}. Create one or pass --profile")]
    NoProfile(Vec<PathBuf>),

    /// A path given on the command line does not resolve in the view.
    #[error("path not found in the merged view: {0}")]
    PathNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_not_found_display() {
        let err = CliError::PathNotFound("textures/missing.dds".to_string());
        assert!(err.to_string().contains("textures/missing.dds"));
    }
}
