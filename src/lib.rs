//! Patchwork
//!
//! The in-process state layer of a live UI editing tool: a versioned graph of
//! routes, component types and instances, session-scoped property overrides
//! persisted per workspace, and transactional application of source edits.
//! [`Workspace`] wires the three stores together for one open workspace.

pub mod error;
pub mod workspace;

pub use error::WorkspaceError;
pub use workspace::{SaveReport, Workspace};

pub use patchwork_core as core;
pub use patchwork_edits as edits;
pub use patchwork_graph_store as graph;
pub use patchwork_monitoring as monitoring;
pub use patchwork_override_store as overrides;
