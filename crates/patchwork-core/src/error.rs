use std::io::{self, ErrorKind};
use thiserror::Error;

/// Core error type shared across the Patchwork crates
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Input/output error
    #[error("Input/output error: {0}")]
    IOError(String),

    /// Promoter failed to produce edits
    #[error("Promoter error: {0}")]
    PromoterError(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::IOError(err.to_string())
    }
}

/// Actionable remediation hint for a filesystem failure
pub fn remediation_hint(err: &io::Error) -> &'static str {
    match err.kind() {
        ErrorKind::PermissionDenied => "check that the workspace is writable by the current user",
        ErrorKind::NotFound => "the workspace path no longer exists; reopen the workspace",
        ErrorKind::StorageFull => "the disk is full; free some space and save again",
        ErrorKind::ReadOnlyFilesystem => "the filesystem is read-only; remount it read-write",
        _ => "inspect the underlying I/O error",
    }
}
