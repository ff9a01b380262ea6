//!
//! Patchwork Core - shared domain model for the Patchwork state layer
//!
//! This crate defines the identifiers, the graph / override / file-edit data
//! model with its wire shapes, and the traits the stores and their external
//! collaborators implement. It is the foundation for all other crates in the
//! workspace.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - identifiers, data model and store traits
pub mod domain;

/// Error types
pub mod error;

/// Configuration loading
pub mod config;

// Re-export key types
pub use config::PatchworkConfig;
pub use error::{remediation_hint, CoreError};

pub use domain::edits::{FileEdit, TextRangeEdit};
pub use domain::graph::{
    GraphEdge, GraphEvent, GraphNode, GraphOp, GraphPatch, GraphRevision, GraphSnapshot, NodeRef,
    SchemaVersion, SourceRef,
};
pub use domain::ids::{ComponentTypeId, InstanceId, ProducerId, RouteId, SessionId};
pub use domain::overrides::{
    InstanceLocator, Override, OverrideOp, OverrideTarget, PropertyPath, SessionOverride,
};
pub use domain::repository::{GraphStore, Promoter};
