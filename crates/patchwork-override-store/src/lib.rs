//! Patchwork Override Store
//!
//! Holds, per live session, the property overrides a user applied to running
//! component instances, and keeps a workspace-scoped file in sync with them.
//! Every mutating call rewrites the whole file with a write-to-temp then
//! rename sequence, so the file on disk is always a complete document.

pub mod document;
pub mod error;
pub mod store;

mod persist;

pub use document::{parse_overrides_file, render_overrides_file, OverrideGroup, OverridesDocument};
pub use error::{OverrideStoreError, OverrideStoreResult};
pub use store::{OrphanedOverride, OverrideStore};
