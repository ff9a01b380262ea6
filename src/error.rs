use patchwork_core::CoreError;
use patchwork_edits::{AppliedFile, EditError};
use patchwork_override_store::OverrideStoreError;
use thiserror::Error;

/// Errors surfaced by [`Workspace`](crate::Workspace) operations
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// Invalid configuration or other core failure
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Override store failure
    #[error(transparent)]
    Overrides(#[from] OverrideStoreError),

    /// The edit batch was rejected or rolled back
    #[error("Edit batch failed: {0}")]
    Edit(#[from] EditError),

    /// The promoter could not turn overrides into edits
    #[error("Promotion failed: {0}")]
    Promoter(CoreError),

    /// The edit batch committed but clearing the promoted overrides failed
    ///
    /// The files in `applied` were already rewritten. The overrides are gone
    /// from memory, but the overrides file still lists them until the next
    /// successful write.
    #[error("Edits were applied but the promoted overrides could not be cleared: {source}")]
    PersistAfterCommit {
        /// Files the committed batch touched
        applied: Vec<AppliedFile>,
        /// The override store failure
        #[source]
        source: OverrideStoreError,
    },
}
