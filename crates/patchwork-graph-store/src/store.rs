//! In-memory implementation of the GraphStore interface
//!
//! All mutation happens under a single write lock, and the revision counter
//! and event publication advance under that same lock, so a snapshot never
//! carries a revision that does not match its node and edge set.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, trace, warn};

use patchwork_core::{
    GraphEdge, GraphEvent, GraphNode, GraphOp, GraphPatch, GraphRevision, GraphSnapshot,
    GraphStore, NodeRef, PatchworkConfig, ProducerId, SchemaVersion,
};

use crate::ownership::ProducerContribution;

const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Failure of a single op; always skipped, never fatal to the patch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
enum SoftOpError {
    #[error("node {0} is not in the graph")]
    NodeNotFound(NodeRef),

    #[error("edge {0} is not in the graph")]
    EdgeNotFound(GraphEdge),
}

#[derive(Debug, Default)]
struct GraphState {
    revision: GraphRevision,
    nodes: BTreeMap<NodeRef, GraphNode>,
    edges: BTreeSet<GraphEdge>,
    producers: HashMap<ProducerId, ProducerContribution>,
}

impl GraphState {
    fn apply_op(&mut self, op: &GraphOp) -> Result<(), SoftOpError> {
        match op {
            GraphOp::UpsertNode { node } => {
                self.nodes.insert(node.node_ref(), node.clone());
            }
            GraphOp::RemoveNode { node } => {
                self.nodes
                    .remove(node)
                    .ok_or_else(|| SoftOpError::NodeNotFound(node.clone()))?;
            }
            GraphOp::UpsertEdge { edge } => {
                self.edges.insert(edge.clone());
            }
            GraphOp::RemoveEdge { edge } => {
                if !self.edges.remove(edge) {
                    return Err(SoftOpError::EdgeNotFound(edge.clone()));
                }
            }
        }
        Ok(())
    }

    /// Apply `ops` in order and advance the revision by exactly one
    fn apply_ops(&mut self, ops: &[GraphOp]) -> GraphRevision {
        let mut skipped = 0usize;
        for op in ops {
            if let Err(e) = self.apply_op(op) {
                warn!(error = %e, "Skipping graph op");
                skipped += 1;
            }
        }

        self.revision = self.revision.next();
        debug!(
            revision = %self.revision,
            op_count = ops.len(),
            skipped,
            "Applied graph patch"
        );
        self.revision
    }

    fn node_owned_by_other(&self, node_ref: &NodeRef) -> bool {
        self.producers
            .values()
            .any(|contribution| contribution.nodes.contains(node_ref))
    }

    fn edge_owned_by_other(&self, edge: &GraphEdge) -> bool {
        self.producers
            .values()
            .any(|contribution| contribution.edges.contains(edge))
    }

    fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            schema_version: SchemaVersion::V0,
            revision: self.revision,
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.iter().cloned().collect(),
        }
    }
}

/// In-memory implementation of [`GraphStore`]
pub struct InMemoryGraphStore {
    state: RwLock<GraphState>,
    events: broadcast::Sender<GraphEvent>,
}

impl InMemoryGraphStore {
    /// Create a new, empty graph store
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a store whose event stream buffers `capacity` events per subscriber
    pub fn with_event_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            state: RwLock::new(GraphState::default()),
            events,
        }
    }

    /// Create a store from configuration
    pub fn from_config(config: &PatchworkConfig) -> Self {
        Self::with_event_capacity(config.graph_event_capacity)
    }

    /// Current revision
    pub async fn revision(&self) -> GraphRevision {
        self.state.read().await.revision
    }

    /// Producers with a recorded contribution, sorted
    pub async fn producer_ids(&self) -> Vec<ProducerId> {
        let state = self.state.read().await;
        let mut ids: Vec<ProducerId> = state.producers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Withdraw a producer's whole contribution
    ///
    /// Returns `None` without touching the revision when the producer has
    /// never contributed.
    pub async fn remove_producer(&self, producer_id: &ProducerId) -> Option<GraphRevision> {
        let mut state = self.state.write().await;
        if !state.producers.contains_key(producer_id) {
            return None;
        }

        let revision =
            self.replace_contribution(&mut state, producer_id, GraphSnapshot::default(), false);
        info!(producer_id = %producer_id, revision = %revision, "Removed graph producer");
        Some(revision)
    }

    /// Diff `snapshot` against the producer's recorded keys and apply the
    /// result as one patch
    fn replace_contribution(
        &self,
        state: &mut GraphState,
        producer_id: &ProducerId,
        snapshot: GraphSnapshot,
        retain: bool,
    ) -> GraphRevision {
        let incoming = ProducerContribution::from_snapshot(&snapshot);
        let previous = state.producers.remove(producer_id).unwrap_or_default();

        let mut ops = Vec::with_capacity(snapshot.nodes.len() + snapshot.edges.len());

        // Removals first; keys another producer still owns are left alone
        for node_ref in previous.dropped_nodes(&incoming) {
            if state.node_owned_by_other(node_ref) {
                debug!(node = %node_ref, "Node still owned by another producer, keeping it");
                continue;
            }
            ops.push(GraphOp::RemoveNode {
                node: node_ref.clone(),
            });
        }
        for edge in previous.dropped_edges(&incoming) {
            if state.edge_owned_by_other(edge) {
                debug!(edge = %edge, "Edge still owned by another producer, keeping it");
                continue;
            }
            ops.push(GraphOp::RemoveEdge { edge: edge.clone() });
        }
        let removed = ops.len();

        ops.extend(
            snapshot
                .nodes
                .into_iter()
                .map(|node| GraphOp::UpsertNode { node }),
        );
        ops.extend(
            snapshot
                .edges
                .into_iter()
                .map(|edge| GraphOp::UpsertEdge { edge }),
        );

        let revision = state.apply_ops(&ops);
        if retain {
            state.producers.insert(producer_id.clone(), incoming);
        }

        info!(
            producer_id = %producer_id,
            revision = %revision,
            removed,
            upserted = ops.len() - removed,
            "Applied producer snapshot"
        );
        self.publish(GraphEvent::Patched { revision, ops });
        revision
    }

    fn publish(&self, event: GraphEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn get_snapshot(&self) -> GraphSnapshot {
        self.state.read().await.snapshot()
    }

    async fn apply_patch(&self, patch: GraphPatch) -> GraphRevision {
        trace!(producer_revision = %patch.revision, "Ignoring producer-local revision");

        let mut state = self.state.write().await;
        let revision = state.apply_ops(&patch.ops);
        self.publish(GraphEvent::Patched {
            revision,
            ops: patch.ops,
        });
        revision
    }

    async fn apply_snapshot(
        &self,
        producer_id: &ProducerId,
        snapshot: GraphSnapshot,
    ) -> GraphRevision {
        let mut state = self.state.write().await;
        self.replace_contribution(&mut state, producer_id, snapshot, true)
    }

    async fn get_node(&self, node_ref: &NodeRef) -> Option<GraphNode> {
        self.state.read().await.nodes.get(node_ref).cloned()
    }

    async fn reset(&self) -> GraphRevision {
        let mut state = self.state.write().await;
        state.nodes.clear();
        state.edges.clear();
        state.producers.clear();
        state.revision = state.revision.next();

        let revision = state.revision;
        info!(revision = %revision, "Graph store reset");
        self.publish(GraphEvent::Reset { revision });
        revision
    }

    fn subscribe(&self) -> broadcast::Receiver<GraphEvent> {
        self.events.subscribe()
    }
}
