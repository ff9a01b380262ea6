//! Patchwork Workspace Edit Engine
//!
//! Applies a batch of [`FileEdit`](patchwork_core::FileEdit)s to the user's
//! source tree as one logical transaction. A validation pass computes every
//! resulting file without touching the workspace; a commit pass then stages
//! temp files, moves originals aside as backups and renames the temps into
//! place, restoring the backups if any step fails.

pub mod engine;
pub mod error;

mod commit;
mod staging;

pub use engine::WorkspaceEditEngine;
pub use error::{AppliedFile, EditError, EditErrorCode, EditOutcome, EditResult};
pub use staging::sha256_hex;
