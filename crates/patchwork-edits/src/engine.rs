//! Workspace edit engine

use std::path::Path;

use tracing::{debug, info, warn};

use patchwork_core::FileEdit;

use crate::commit::Transaction;
use crate::error::{AppliedFile, EditResult};
use crate::staging::{stage, Action};

/// Applies batches of file edits to a workspace as single transactions
///
/// The engine keeps no state between calls.
#[derive(Debug, Default, Clone)]
pub struct WorkspaceEditEngine {
    #[cfg(test)]
    pub(crate) fail_at: Option<(crate::commit::Step, usize)>,
}

impl WorkspaceEditEngine {
    /// Create a new engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `edits` under `workspace_root`, all or nothing
    ///
    /// Returns every edited path in batch order, or the first failure. On
    /// failure no file in the workspace has changed.
    pub async fn apply_edits(
        &self,
        workspace_root: &Path,
        edits: &[FileEdit],
    ) -> EditResult<Vec<AppliedFile>> {
        debug!(
            workspace_root = %workspace_root.display(),
            edit_count = edits.len(),
            "Staging edit batch"
        );

        let changes = stage(workspace_root, edits).await.map_err(|e| {
            warn!(
                code = %e.code,
                file_path = %e.file_path,
                message = %e.message,
                "Rejected edit batch"
            );
            e
        })?;

        #[allow(unused_mut)]
        let mut transaction = Transaction::new();
        #[cfg(test)]
        {
            transaction.fail_at = self.fail_at;
        }
        transaction.commit(&changes).await?;

        let skipped = changes
            .iter()
            .filter(|change| change.action == Action::Skip)
            .count();
        info!(
            workspace_root = %workspace_root.display(),
            files = changes.len(),
            skipped,
            "Applied edit batch"
        );

        Ok(changes
            .into_iter()
            .map(|change| AppliedFile {
                file_path: change.file_path,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::Step;
    use crate::error::EditErrorCode;
    use patchwork_core::TextRangeEdit;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn listing(root: &Path) -> Vec<String> {
        let mut names = Vec::new();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for entry in fs::read_dir(&dir).unwrap() {
                let path = entry.unwrap().path();
                names.push(
                    path.strip_prefix(root)
                        .unwrap()
                        .to_string_lossy()
                        .into_owned(),
                );
                if path.is_dir() {
                    stack.push(path);
                }
            }
        }
        names.sort();
        names
    }

    fn workspace() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        fs::write(dir.path().join("b.txt"), "bravo").unwrap();
        dir
    }

    fn mixed_batch() -> Vec<FileEdit> {
        vec![
            FileEdit::Text {
                file_path: "a.txt".to_string(),
                edits: vec![TextRangeEdit::new(0, 5, "ALPHA")],
                expected_sha256: None,
            },
            FileEdit::Create {
                file_path: "new/dir/c.txt".to_string(),
                contents: "charlie".to_string(),
                overwrite: false,
            },
            FileEdit::Delete {
                file_path: "b.txt".to_string(),
                allow_missing: false,
            },
        ]
    }

    async fn assert_rolled_back(fail_at: (Step, usize)) {
        let dir = workspace();
        let before = listing(dir.path());
        let engine = WorkspaceEditEngine {
            fail_at: Some(fail_at),
        };

        let err = engine
            .apply_edits(dir.path(), &mixed_batch())
            .await
            .unwrap_err();

        assert_eq!(err.code, EditErrorCode::IoError, "fault {:?}", fail_at);
        assert_eq!(listing(dir.path()), before, "fault {:?}", fail_at);
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(dir.path().join("b.txt")).unwrap(), "bravo");
    }

    #[tokio::test]
    async fn test_fault_while_writing_temps_rolls_back() {
        assert_rolled_back((Step::WriteTemp, 1)).await;
    }

    #[tokio::test]
    async fn test_fault_while_backing_up_rolls_back() {
        assert_rolled_back((Step::Backup, 2)).await;
    }

    #[tokio::test]
    async fn test_fault_while_placing_rolls_back() {
        // a.txt is already replaced and c.txt placed when the fault hits
        assert_rolled_back((Step::Place, 1)).await;
    }

    #[tokio::test]
    async fn test_mixed_batch_without_fault_commits() {
        let dir = workspace();

        let applied = WorkspaceEditEngine::new()
            .apply_edits(dir.path(), &mixed_batch())
            .await
            .unwrap();

        let paths: Vec<_> = applied.into_iter().map(|a| a.file_path).collect();
        assert_eq!(paths, vec!["a.txt", "new/dir/c.txt", "b.txt"]);
        assert_eq!(
            listing(dir.path()),
            vec!["a.txt", "new", "new/dir", "new/dir/c.txt"]
        );
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "ALPHA");
    }
}
