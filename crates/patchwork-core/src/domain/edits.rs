//! File edit model
//!
//! A save is always a batch of [`FileEdit`]s applied all-or-nothing by the
//! workspace edit engine. Paths are relative to the workspace root.

use serde::{Deserialize, Serialize};

/// Replacement of the byte range `start..end` with `text`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRangeEdit {
    /// Inclusive start byte offset
    pub start: usize,
    /// Exclusive end byte offset
    pub end: usize,
    /// Replacement text
    pub text: String,
}

impl TextRangeEdit {
    /// Create a range replacement
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Create a pure insertion at `offset`
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::new(offset, offset, text)
    }
}

/// A single file edit within a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FileEdit {
    /// Byte-range replacements inside an existing file
    Text {
        /// Workspace-relative path
        file_path: String,
        /// Non-overlapping ranges against the current content
        edits: Vec<TextRangeEdit>,
        /// Lowercase hex SHA-256 the current content must match
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected_sha256: Option<String>,
    },
    /// Whole-file write
    Create {
        /// Workspace-relative path
        file_path: String,
        /// Full file contents
        contents: String,
        /// Whether an existing file may be replaced
        #[serde(default)]
        overwrite: bool,
    },
    /// File removal
    Delete {
        /// Workspace-relative path
        file_path: String,
        /// Whether a missing file is acceptable
        #[serde(default)]
        allow_missing: bool,
    },
}

impl FileEdit {
    /// Path the edit targets
    pub fn file_path(&self) -> &str {
        match self {
            FileEdit::Text { file_path, .. }
            | FileEdit::Create { file_path, .. }
            | FileEdit::Delete { file_path, .. } => file_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_edit_wire_shape() {
        let edit: FileEdit = serde_json::from_value(json!({
            "kind": "text",
            "filePath": "src/App.tsx",
            "edits": [{ "start": 4, "end": 9, "text": "Hello" }],
            "expectedSha256": "abc"
        }))
        .unwrap();

        assert_eq!(edit.file_path(), "src/App.tsx");
        assert_eq!(
            edit,
            FileEdit::Text {
                file_path: "src/App.tsx".to_string(),
                edits: vec![TextRangeEdit::new(4, 9, "Hello")],
                expected_sha256: Some("abc".to_string()),
            }
        );
    }

    #[test]
    fn test_flags_default_to_false() {
        let edit: FileEdit =
            serde_json::from_value(json!({ "kind": "delete", "filePath": "old.css" })).unwrap();
        assert_eq!(
            edit,
            FileEdit::Delete {
                file_path: "old.css".to_string(),
                allow_missing: false,
            }
        );
    }
}
