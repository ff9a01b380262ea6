//! Validation pass: turns a batch of edits into concrete file changes
//!
//! Nothing here mutates the workspace. Every check that can reject a batch
//! runs before the commit pass touches a single file.

use std::collections::HashSet;
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;

use patchwork_core::{FileEdit, TextRangeEdit};

use crate::error::{EditError, EditResult};

/// Lowercase hex SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// What the commit pass must do to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    /// Write `contents`, replacing the current file when `replaces` is set
    Write { contents: Vec<u8>, replaces: bool },
    /// Remove the current file
    Delete,
    /// Nothing to do (deleting an already missing file)
    Skip,
}

/// One validated change
#[derive(Debug, Clone)]
pub(crate) struct StagedChange {
    pub file_path: String,
    pub target: PathBuf,
    pub action: Action,
}

impl StagedChange {
    /// Whether the commit pass moves an existing file aside
    pub fn has_original(&self) -> bool {
        matches!(
            self.action,
            Action::Write { replaces: true, .. } | Action::Delete
        )
    }
}

/// Validate every edit and compute the resulting changes
pub(crate) async fn stage(root: &Path, edits: &[FileEdit]) -> EditResult<Vec<StagedChange>> {
    let mut seen = HashSet::with_capacity(edits.len());
    let mut staged = Vec::with_capacity(edits.len());

    for edit in edits {
        let file_path = edit.file_path();
        let relative = relative_path(file_path)?;
        if !seen.insert(relative.clone()) {
            return Err(EditError::invalid(
                file_path,
                "file is targeted by more than one edit in the batch",
            ));
        }
        let target = root.join(&relative);
        let existing = metadata(file_path, &target).await?;
        if existing.as_ref().is_some_and(|meta| meta.is_dir()) {
            return Err(EditError::invalid(file_path, "path is a directory"));
        }

        let action = match edit {
            FileEdit::Text {
                edits: ranges,
                expected_sha256,
                ..
            } => {
                if existing.is_none() {
                    return Err(EditError::not_found(file_path, "file does not exist"));
                }
                let current = fs::read(&target)
                    .await
                    .map_err(|e| EditError::io(file_path, "failed to read file", &e))?;
                if let Some(expected) = expected_sha256 {
                    let actual = sha256_hex(&current);
                    if !expected.eq_ignore_ascii_case(&actual) {
                        return Err(EditError::conflict(
                            file_path,
                            format!(
                                "content changed on disk (expected sha256 {}, found {})",
                                expected, actual
                            ),
                        ));
                    }
                }
                Action::Write {
                    contents: apply_ranges(file_path, &current, ranges)?,
                    replaces: true,
                }
            }
            FileEdit::Create {
                contents,
                overwrite,
                ..
            } => {
                if existing.is_some() && !overwrite {
                    return Err(EditError::conflict(
                        file_path,
                        "file already exists and overwrite is not allowed",
                    ));
                }
                Action::Write {
                    contents: contents.as_bytes().to_vec(),
                    replaces: existing.is_some(),
                }
            }
            FileEdit::Delete { allow_missing, .. } => match existing {
                Some(_) => Action::Delete,
                None if *allow_missing => Action::Skip,
                None => return Err(EditError::not_found(file_path, "file does not exist")),
            },
        };

        staged.push(StagedChange {
            file_path: file_path.to_string(),
            target,
            action,
        });
    }

    Ok(staged)
}

/// Normalize a workspace-relative path, rejecting anything that could escape
/// the workspace root
pub(crate) fn relative_path(file_path: &str) -> EditResult<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(file_path).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(EditError::invalid(file_path, "path must not contain '..'"))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(EditError::invalid(
                    file_path,
                    "path must be relative to the workspace root",
                ))
            }
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(EditError::invalid(file_path, "path is empty"));
    }
    Ok(relative)
}

async fn metadata(file_path: &str, target: &Path) -> EditResult<Option<Metadata>> {
    match fs::metadata(target).await {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(EditError::io(file_path, "failed to inspect file", &e)),
    }
}

/// Apply byte-range replacements to `current`
///
/// Ranges are sorted by start offset (ties keep batch order, so several
/// insertions at one offset land in the order given) and must neither overlap
/// nor reach past the end of the content.
pub(crate) fn apply_ranges(
    file_path: &str,
    current: &[u8],
    ranges: &[TextRangeEdit],
) -> EditResult<Vec<u8>> {
    let mut sorted: Vec<&TextRangeEdit> = ranges.iter().collect();
    sorted.sort_by_key(|range| range.start);

    let mut out = Vec::with_capacity(current.len());
    let mut cursor = 0;
    for range in sorted {
        if range.start > range.end {
            return Err(EditError::invalid(
                file_path,
                format!("range {}..{} has start after end", range.start, range.end),
            ));
        }
        if range.end > current.len() {
            return Err(EditError::invalid(
                file_path,
                format!(
                    "range {}..{} is out of bounds for {} bytes",
                    range.start,
                    range.end,
                    current.len()
                ),
            ));
        }
        if range.start < cursor {
            return Err(EditError::invalid(
                file_path,
                format!(
                    "range {}..{} overlaps a preceding range ending at {}",
                    range.start, range.end, cursor
                ),
            ));
        }
        out.extend_from_slice(&current[cursor..range.start]);
        out.extend_from_slice(range.text.as_bytes());
        cursor = range.end;
    }
    out.extend_from_slice(&current[cursor..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EditErrorCode;
    use pretty_assertions::assert_eq;

    fn apply(current: &str, ranges: Vec<TextRangeEdit>) -> EditResult<String> {
        apply_ranges("f.txt", current.as_bytes(), &ranges)
            .map(|bytes| String::from_utf8(bytes).unwrap())
    }

    #[test]
    fn test_ranges_apply_in_offset_order() {
        let out = apply(
            "Hello, world!",
            vec![
                TextRangeEdit::new(7, 12, "Rust"),
                TextRangeEdit::new(0, 5, "Goodbye"),
            ],
        )
        .unwrap();
        assert_eq!(out, "Goodbye, Rust!");
    }

    #[test]
    fn test_insertions_at_same_offset_keep_batch_order() {
        let out = apply(
            "ac",
            vec![TextRangeEdit::insert(1, "b"), TextRangeEdit::insert(1, "B")],
        )
        .unwrap();
        assert_eq!(out, "abBc");
    }

    #[test]
    fn test_adjacent_ranges_are_allowed() {
        let out = apply(
            "abcd",
            vec![TextRangeEdit::new(0, 2, "X"), TextRangeEdit::new(2, 4, "Y")],
        )
        .unwrap();
        assert_eq!(out, "XY");
    }

    #[test]
    fn test_range_errors() {
        let overlap = apply(
            "abcdef",
            vec![TextRangeEdit::new(0, 3, "x"), TextRangeEdit::new(2, 4, "y")],
        );
        let out_of_bounds = apply("abc", vec![TextRangeEdit::new(1, 4, "x")]);
        let inverted = apply("abc", vec![TextRangeEdit::new(2, 1, "x")]);

        for result in [overlap, out_of_bounds, inverted] {
            assert_eq!(result.unwrap_err().code, EditErrorCode::InvalidEdit);
        }
    }

    #[test]
    fn test_relative_path_rules() {
        assert_eq!(
            relative_path("./src/App.tsx").unwrap(),
            PathBuf::from("src/App.tsx")
        );
        for bad in ["", ".", "../outside.txt", "src/../../x", "/etc/passwd"] {
            assert_eq!(
                relative_path(bad).unwrap_err().code,
                EditErrorCode::InvalidEdit,
                "expected {:?} to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
