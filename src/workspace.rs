//! Workspace facade

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info};

use patchwork_core::{GraphStore, PatchworkConfig, Promoter};
use patchwork_edits::{AppliedFile, WorkspaceEditEngine};
use patchwork_graph_store::InMemoryGraphStore;
use patchwork_monitoring::LogExt;
use patchwork_override_store::OverrideStore;

use crate::error::WorkspaceError;

/// Result of a successful save
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SaveReport {
    /// Files the promoted edits touched
    pub applied: Vec<AppliedFile>,
    /// Number of overrides baked into source
    pub promoted: usize,
}

struct Active {
    root: PathBuf,
    overrides: Arc<OverrideStore>,
}

/// The stores for one open workspace
pub struct Workspace {
    config: PatchworkConfig,
    graph: Arc<InMemoryGraphStore>,
    active: RwLock<Active>,
    edits: WorkspaceEditEngine,
}

impl Workspace {
    /// Open `root`, loading its persisted overrides
    pub async fn open(
        root: impl Into<PathBuf>,
        config: PatchworkConfig,
    ) -> Result<Self, WorkspaceError> {
        config.validate()?;
        let root = root.into();
        let overrides = OverrideStore::open(&root, &config).await?;
        info!(root = %root.display(), "Opened workspace");

        Ok(Self {
            graph: Arc::new(InMemoryGraphStore::from_config(&config)),
            active: RwLock::new(Active {
                root,
                overrides: Arc::new(overrides),
            }),
            edits: WorkspaceEditEngine::new(),
            config,
        })
    }

    /// Configuration the workspace was opened with
    pub fn config(&self) -> &PatchworkConfig {
        &self.config
    }

    /// The graph store; it outlives workspace switches
    pub fn graph(&self) -> Arc<InMemoryGraphStore> {
        Arc::clone(&self.graph)
    }

    /// The override store of the current workspace
    pub async fn overrides(&self) -> Arc<OverrideStore> {
        Arc::clone(&self.active.read().await.overrides)
    }

    /// Root of the current workspace
    pub async fn root(&self) -> PathBuf {
        self.active.read().await.root.clone()
    }

    /// The edit engine
    pub fn edits(&self) -> &WorkspaceEditEngine {
        &self.edits
    }

    /// Make `root` the active workspace
    ///
    /// The new override store is loaded before anything changes, so a
    /// failure leaves the current workspace in place. On success the graph is
    /// reset.
    pub async fn switch_workspace(&self, root: impl AsRef<Path>) -> Result<(), WorkspaceError> {
        let root = root.as_ref().to_path_buf();
        let overrides = OverrideStore::open(&root, &self.config)
            .await
            .log_err("Failed to load overrides for workspace switch")?;

        let mut active = self.active.write().await;
        let previous = std::mem::replace(
            &mut *active,
            Active {
                root,
                overrides: Arc::new(overrides),
            },
        );
        let revision = self.graph.reset().await;
        info!(
            from = %previous.root.display(),
            to = %active.root.display(),
            revision = %revision,
            "Switched workspace"
        );
        Ok(())
    }

    /// Promote every live override into source through `promoter`
    ///
    /// On success the promoted overrides are cleared from their sessions,
    /// except those changed while the save ran. If promotion or the edit
    /// batch fails, the overrides are left untouched and no file has changed.
    /// If clearing fails after the batch committed, the files are already
    /// rewritten and [`WorkspaceError::PersistAfterCommit`] is returned.
    pub async fn save(&self, promoter: &dyn Promoter) -> Result<SaveReport, WorkspaceError> {
        let (root, overrides) = {
            let active = self.active.read().await;
            (active.root.clone(), Arc::clone(&active.overrides))
        };

        let promoted = overrides.get_all_overrides().await;
        if promoted.is_empty() {
            debug!("Nothing to save");
            return Ok(SaveReport::default());
        }

        let edits = promoter
            .promote(&promoted)
            .await
            .map_err(WorkspaceError::Promoter)
            .log_err("Promotion failed")?;
        let applied = self
            .edits
            .apply_edits(&root, &edits)
            .await
            .log_err("Edit batch failed")?;

        let cleared = match overrides.clear_promoted(&promoted).await {
            Ok(cleared) => cleared,
            Err(source) => {
                error!(
                    root = %root.display(),
                    files = applied.len(),
                    error = %source,
                    "Edits applied but promoted overrides were not cleared"
                );
                return Err(WorkspaceError::PersistAfterCommit { applied, source });
            }
        };

        info!(
            root = %root.display(),
            promoted = promoted.len(),
            cleared,
            files = applied.len(),
            "Saved overrides to source"
        );
        Ok(SaveReport {
            applied,
            promoted: promoted.len(),
        })
    }
}
