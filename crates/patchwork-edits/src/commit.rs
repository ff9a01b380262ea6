//! Commit pass with backup-based rollback
//!
//! Order: write temps, move originals aside as backups, rename temps into
//! place, then drop backups. Any failure before the last step rolls back.
//! Temp and backup names carry a per-transaction token, so transactions on
//! unrelated files never collide. Transactions on the same file are not
//! excluded from each other here; callers serialize those.

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};
use uuid::Uuid;

use patchwork_core::remediation_hint;

use crate::error::{EditError, EditResult};
use crate::staging::{Action, StagedChange};

/// Commit steps, used to inject faults in tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    WriteTemp,
    Backup,
    Place,
}

/// (file path, what was being done, cause)
type StepFailure = (String, &'static str, io::Error);

#[derive(Debug, Default)]
pub(crate) struct Transaction {
    token: String,
    /// Temps not yet renamed into place
    temps: Vec<PathBuf>,
    /// (backup, original) pairs
    backups: Vec<(PathBuf, PathBuf)>,
    /// Files placed where nothing existed before
    created: Vec<PathBuf>,
    /// Directories created for new files, outermost first
    created_dirs: Vec<PathBuf>,
    #[cfg(test)]
    pub(crate) fail_at: Option<(Step, usize)>,
}

impl Transaction {
    pub(crate) fn new() -> Self {
        Self {
            token: Uuid::new_v4().simple().to_string(),
            ..Self::default()
        }
    }

    /// Apply staged changes, rolling back on failure
    pub(crate) async fn commit(mut self, changes: &[StagedChange]) -> EditResult<()> {
        match self.run(changes).await {
            Ok(()) => {
                self.discard_backups().await;
                Ok(())
            }
            Err((file_path, context, err)) => {
                error!(
                    file_path = %file_path,
                    error = %err,
                    hint = remediation_hint(&err),
                    "{}; rolling back edit batch",
                    context
                );
                self.rollback().await;
                Err(EditError::io(&file_path, context, &err))
            }
        }
    }

    async fn run(&mut self, changes: &[StagedChange]) -> Result<(), StepFailure> {
        let mut temps = Vec::with_capacity(changes.len());
        for (index, change) in changes.iter().enumerate() {
            if let Action::Write { contents, .. } = &change.action {
                let context = "failed to write temporary file";
                self.check(Step::WriteTemp, index)
                    .map_err(|e| (change.file_path.clone(), context, e))?;
                let parent_context = "failed to create parent directory";
                self.ensure_parent(&change.target)
                    .await
                    .map_err(|e| (change.file_path.clone(), parent_context, e))?;
                let tmp = self.sibling(&change.target, "tmp");
                self.temps.push(tmp.clone());
                write_synced(&tmp, contents)
                    .await
                    .map_err(|e| (change.file_path.clone(), context, e))?;
                temps.push(Some(tmp));
            } else {
                temps.push(None);
            }
        }

        for (index, change) in changes.iter().enumerate() {
            if !change.has_original() {
                continue;
            }
            let context = "failed to back up original";
            let backup = self.sibling(&change.target, "bak");
            self.check(Step::Backup, index)
                .map_err(|e| (change.file_path.clone(), context, e))?;
            fs::rename(&change.target, &backup)
                .await
                .map_err(|e| (change.file_path.clone(), context, e))?;
            self.backups.push((backup, change.target.clone()));
        }

        for (index, (change, tmp)) in changes.iter().zip(temps).enumerate() {
            let Some(tmp) = tmp else { continue };
            let context = "failed to move file into place";
            self.check(Step::Place, index)
                .map_err(|e| (change.file_path.clone(), context, e))?;
            fs::rename(&tmp, &change.target)
                .await
                .map_err(|e| (change.file_path.clone(), context, e))?;
            self.temps.retain(|t| t != &tmp);
            if !change.has_original() {
                self.created.push(change.target.clone());
            }
        }

        Ok(())
    }

    /// Create missing ancestors of `target`, remembering which ones were new
    async fn ensure_parent(&mut self, target: &Path) -> io::Result<()> {
        let Some(parent) = target.parent() else {
            return Ok(());
        };
        let mut missing = Vec::new();
        let mut dir = parent;
        while !fs::try_exists(dir).await? {
            missing.push(dir.to_path_buf());
            match dir.parent() {
                Some(up) => dir = up,
                None => break,
            }
        }
        if missing.is_empty() {
            return Ok(());
        }
        fs::create_dir_all(parent).await?;
        missing.reverse();
        self.created_dirs.extend(missing);
        Ok(())
    }

    fn sibling(&self, target: &Path, suffix: &str) -> PathBuf {
        let name = target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        target.with_file_name(format!(".{}.{}.{}", name, self.token, suffix))
    }

    /// Drop backups once every file is in its final place
    ///
    /// The batch is committed at this point, so failures are only logged.
    async fn discard_backups(&mut self) {
        for (backup, original) in self.backups.drain(..) {
            if let Err(e) = fs::remove_file(&backup).await {
                warn!(
                    backup = %backup.display(),
                    original = %original.display(),
                    error = %e,
                    "Failed to remove edit backup"
                );
            }
        }
    }

    /// Best-effort restore of the pre-transaction file set
    async fn rollback(&mut self) {
        for tmp in self.temps.drain(..) {
            remove_quietly(&tmp, "temporary file").await;
        }
        for created in self.created.drain(..) {
            remove_quietly(&created, "created file").await;
        }
        for (backup, original) in self.backups.drain(..).rev() {
            match fs::rename(&backup, &original).await {
                Ok(()) => debug!(original = %original.display(), "Restored original"),
                Err(e) => error!(
                    backup = %backup.display(),
                    original = %original.display(),
                    error = %e,
                    "Failed to restore original; the backup was left in place"
                ),
            }
        }
        for dir in self.created_dirs.drain(..).rev() {
            if let Err(e) = fs::remove_dir(&dir).await {
                debug!(dir = %dir.display(), error = %e, "Left created directory in place");
            }
        }
    }

    #[cfg(test)]
    fn check(&self, step: Step, index: usize) -> io::Result<()> {
        match self.fail_at {
            Some(fault) if fault == (step, index) => {
                Err(io::Error::new(ErrorKind::Other, "injected fault"))
            }
            _ => Ok(()),
        }
    }

    #[cfg(not(test))]
    fn check(&self, _step: Step, _index: usize) -> io::Result<()> {
        Ok(())
    }
}

async fn write_synced(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await
}

async fn remove_quietly(path: &Path, what: &str) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            error!(path = %path.display(), error = %e, "Failed to remove {} during rollback", what);
        }
    }
}
