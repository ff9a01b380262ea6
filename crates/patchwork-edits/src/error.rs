//! Edit batch errors and the wire form of a batch result

use std::fmt;
use std::io::{self, ErrorKind};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a batch was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EditErrorCode {
    /// The file changed out of band, or exists when it must not
    Conflict,
    /// The file is missing when it must exist
    NotFound,
    /// The filesystem refused access
    PermissionDenied,
    /// The edit itself is malformed
    InvalidEdit,
    /// Any other filesystem failure
    IoError,
}

impl EditErrorCode {
    /// Classify an I/O failure
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            ErrorKind::NotFound => EditErrorCode::NotFound,
            ErrorKind::PermissionDenied => EditErrorCode::PermissionDenied,
            _ => EditErrorCode::IoError,
        }
    }
}

impl fmt::Display for EditErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            EditErrorCode::Conflict => "conflict",
            EditErrorCode::NotFound => "notFound",
            EditErrorCode::PermissionDenied => "permissionDenied",
            EditErrorCode::InvalidEdit => "invalidEdit",
            EditErrorCode::IoError => "ioError",
        };
        f.write_str(code)
    }
}

/// The single failure that aborted a batch
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{code} on {file_path}: {message}")]
pub struct EditError {
    /// Failure class
    pub code: EditErrorCode,
    /// Workspace-relative path of the offending edit
    pub file_path: String,
    /// Human-readable detail
    pub message: String,
}

impl EditError {
    /// Create an error
    pub fn new(
        code: EditErrorCode,
        file_path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            file_path: file_path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn conflict(file_path: &str, message: impl Into<String>) -> Self {
        Self::new(EditErrorCode::Conflict, file_path, message)
    }

    pub(crate) fn not_found(file_path: &str, message: impl Into<String>) -> Self {
        Self::new(EditErrorCode::NotFound, file_path, message)
    }

    pub(crate) fn invalid(file_path: &str, message: impl Into<String>) -> Self {
        Self::new(EditErrorCode::InvalidEdit, file_path, message)
    }

    /// Wrap an I/O failure, classifying it by kind
    pub(crate) fn io(file_path: &str, context: &str, err: &io::Error) -> Self {
        Self::new(
            EditErrorCode::from_io(err),
            file_path,
            format!("{}: {}", context, err),
        )
    }
}

/// A file the batch touched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFile {
    /// Workspace-relative path as given in the edit
    pub file_path: String,
}

/// Wire form of a batch result
///
/// `{ "ok": true, "applied": [...] }` or `{ "ok": false, "error": {...} }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOutcome {
    /// Whether the whole batch was committed
    pub ok: bool,
    /// Files touched, in batch order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied: Option<Vec<AppliedFile>>,
    /// The failure that aborted the batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EditError>,
}

impl From<Result<Vec<AppliedFile>, EditError>> for EditOutcome {
    fn from(result: Result<Vec<AppliedFile>, EditError>) -> Self {
        match result {
            Ok(applied) => Self {
                ok: true,
                applied: Some(applied),
                error: None,
            },
            Err(error) => Self {
                ok: false,
                applied: None,
                error: Some(error),
            },
        }
    }
}

/// Result type for edit batches
pub type EditResult<T> = Result<T, EditError>;
