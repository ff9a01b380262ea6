//! Error types for the override store

use std::io;
use std::path::PathBuf;

use patchwork_core::CoreError;
use thiserror::Error;

/// Errors that can occur during override store operations
#[derive(Error, Debug)]
pub enum OverrideStoreError {
    /// An operation in the batch is structurally invalid; nothing was applied
    #[error("Invalid override operation: {0}")]
    InvalidOp(CoreError),

    /// The overrides file could not be written
    #[error("Failed to persist overrides to {}: {source} ({hint})", path.display())]
    Persist {
        /// Target file
        path: PathBuf,
        /// What the user can do about it
        hint: &'static str,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// The overrides file exists but could not be read
    #[error("Failed to read overrides from {}: {source}", path.display())]
    Load {
        /// Source file
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// The overrides file is not a valid document
    #[error("Persisted overrides at {} are corrupt: {source}", path.display())]
    Corrupt {
        /// Source file
        path: PathBuf,
        /// Parse failure
        #[source]
        source: serde_json::Error,
    },

    /// The in-memory state could not be serialized
    #[error("Failed to serialize overrides: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for override store operations
pub type OverrideStoreResult<T> = Result<T, OverrideStoreError>;
