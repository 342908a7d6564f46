//! Error types for the materializer module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while filing model artifacts.
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// Failed to create an output directory.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write an artifact, including the one retry.
    #[error("Failed to write artifact: {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A completed job carried no artifacts.
    #[error("No artifacts to materialize")]
    NoArtifacts,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MaterializeError {
    /// Whether a later materialization pass may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DirectoryCreationFailed { .. } | Self::WriteFailed { .. } | Self::Io(_)
        )
    }
}
