//! Store and collaborator traits
//!
//! The graph store is consumed through [`GraphStore`] so callers can swap the
//! in-memory implementation; [`Promoter`] is implemented outside this
//! workspace by whatever turns overrides into source edits.

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::edits::FileEdit;
use super::graph::{GraphEvent, GraphNode, GraphPatch, GraphRevision, GraphSnapshot, NodeRef};
use super::ids::ProducerId;
use super::overrides::SessionOverride;
use crate::CoreError;

/// Versioned graph of routes, component types and instances
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Current revision with the full node and edge lists
    async fn get_snapshot(&self) -> GraphSnapshot;

    /// Apply every op in order and assign exactly one new revision
    async fn apply_patch(&self, patch: GraphPatch) -> GraphRevision;

    /// Replace a producer's whole contribution with `snapshot`
    async fn apply_snapshot(&self, producer_id: &ProducerId, snapshot: GraphSnapshot)
        -> GraphRevision;

    /// Point lookup; absent nodes are `None`
    async fn get_node(&self, node_ref: &NodeRef) -> Option<GraphNode>;

    /// Clear all nodes, edges and producer ownership
    async fn reset(&self) -> GraphRevision;

    /// Subscribe to patch and reset events
    fn subscribe(&self) -> broadcast::Receiver<GraphEvent>;
}

/// Turns a set of overrides into a batch of file edits
#[async_trait]
pub trait Promoter: Send + Sync {
    /// Produce the file edits that bake `overrides` into source
    async fn promote(&self, overrides: &[SessionOverride]) -> Result<Vec<FileEdit>, CoreError>;
}
