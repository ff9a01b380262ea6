//! Structural graph model
//!
//! Nodes are routes, component types and live instances; edges record which
//! component types a route or another component type uses. Producers push
//! whole [`GraphSnapshot`]s or incremental [`GraphPatch`]es, and consumers
//! observe the result as a snapshot plus a stream of [`GraphEvent`]s.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{ComponentTypeId, InstanceId, RouteId, SessionId};

/// Wire schema version of graph snapshots and patches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaVersion {
    /// The only version currently understood
    #[default]
    #[serde(rename = "v0")]
    V0,
}

/// Process-wide graph revision, owned by the graph store
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GraphRevision(pub u64);

impl GraphRevision {
    /// The revision that follows this one
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// The raw counter value
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GraphRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location in a source file a node was derived from
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    /// Path of the source file
    pub file_path: String,
    /// 1-based line, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// 1-based column, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

/// A node in the structural graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GraphNode {
    /// A route of the target application
    Route {
        /// Route identifier
        id: RouteId,
        /// Route path, e.g. `/about`
        path: String,
        /// Where the route is declared
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<SourceRef>,
    },
    /// A component type
    ComponentType {
        /// Namespaced component type id
        id: ComponentTypeId,
        /// Human readable name
        display_name: String,
        /// Where the component type is declared
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<SourceRef>,
    },
    /// A live, running occurrence of a component type
    Instance {
        /// Session the instance belongs to
        session_id: SessionId,
        /// Instance id, unique within the session
        instance_id: InstanceId,
        /// Component type of the instance, when known
        #[serde(default, skip_serializing_if = "Option::is_none")]
        component_type_id: Option<ComponentTypeId>,
        /// Where the instance is rendered from
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<SourceRef>,
    },
}

impl GraphNode {
    /// Create a route node
    pub fn route(id: impl Into<RouteId>, path: impl Into<String>) -> Self {
        GraphNode::Route {
            id: id.into(),
            path: path.into(),
            source: None,
        }
    }

    /// Create a route node whose id is derived from its path
    pub fn route_for_path(path: &str) -> Self {
        Self::route(RouteId::from_path(path), path)
    }

    /// Create a component type node
    pub fn component_type(id: impl Into<ComponentTypeId>, display_name: impl Into<String>) -> Self {
        GraphNode::ComponentType {
            id: id.into(),
            display_name: display_name.into(),
            source: None,
        }
    }

    /// Create an instance node
    pub fn instance(session_id: impl Into<SessionId>, instance_id: impl Into<InstanceId>) -> Self {
        GraphNode::Instance {
            session_id: session_id.into(),
            instance_id: instance_id.into(),
            component_type_id: None,
            source: None,
        }
    }

    /// Attach a source reference
    pub fn with_source(mut self, source_ref: SourceRef) -> Self {
        match &mut self {
            GraphNode::Route { source, .. }
            | GraphNode::ComponentType { source, .. }
            | GraphNode::Instance { source, .. } => *source = Some(source_ref),
        }
        self
    }

    /// Identity of this node: its kind plus kind-specific id
    pub fn node_ref(&self) -> NodeRef {
        match self {
            GraphNode::Route { id, .. } => NodeRef::Route { id: id.clone() },
            GraphNode::ComponentType { id, .. } => NodeRef::ComponentType { id: id.clone() },
            GraphNode::Instance {
                session_id,
                instance_id,
                ..
            } => NodeRef::Instance {
                session_id: session_id.clone(),
                instance_id: instance_id.clone(),
            },
        }
    }

    /// Source reference, if any
    pub fn source(&self) -> Option<&SourceRef> {
        match self {
            GraphNode::Route { source, .. }
            | GraphNode::ComponentType { source, .. }
            | GraphNode::Instance { source, .. } => source.as_ref(),
        }
    }
}

/// Reference to a node by discriminant and id
///
/// Instance references include the session id so instances of concurrent
/// sessions never collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum NodeRef {
    /// A route node
    Route {
        /// Route identifier
        id: RouteId,
    },
    /// A component type node
    ComponentType {
        /// Component type identifier
        id: ComponentTypeId,
    },
    /// An instance node
    Instance {
        /// Owning session
        session_id: SessionId,
        /// Instance id within the session
        instance_id: InstanceId,
    },
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Route { id } => write!(f, "route:{}", id),
            NodeRef::ComponentType { id } => write!(f, "componentType:{}", id),
            NodeRef::Instance {
                session_id,
                instance_id,
            } => write!(f, "instance:{}:{}", session_id, instance_id),
        }
    }
}

/// A structural edge
///
/// Edges are identified by their full content; two edges with identical
/// fields are the same edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GraphEdge {
    /// A route renders a component type
    RouteUsesComponentType {
        /// Route id
        from: RouteId,
        /// Component type id
        to: ComponentTypeId,
    },
    /// A component type renders another component type
    ComponentTypeUsesComponentType {
        /// Using component type
        from: ComponentTypeId,
        /// Used component type
        to: ComponentTypeId,
    },
}

impl fmt::Display for GraphEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphEdge::RouteUsesComponentType { from, to } => {
                write!(f, "routeUsesComponentType:{}->{}", from, to)
            }
            GraphEdge::ComponentTypeUsesComponentType { from, to } => {
                write!(f, "componentTypeUsesComponentType:{}->{}", from, to)
            }
        }
    }
}

/// A single graph patch operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum GraphOp {
    /// Insert or replace a node
    UpsertNode {
        /// The node to store
        node: GraphNode,
    },
    /// Remove a node
    RemoveNode {
        /// The node to remove
        node: NodeRef,
    },
    /// Insert an edge (no-op if present)
    UpsertEdge {
        /// The edge to store
        edge: GraphEdge,
    },
    /// Remove an edge
    RemoveEdge {
        /// The edge to remove
        edge: GraphEdge,
    },
}

/// An ordered list of graph operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphPatch {
    /// Wire schema version
    #[serde(default)]
    pub schema_version: SchemaVersion,
    /// Producer-local revision; never used as the global revision
    #[serde(default)]
    pub revision: GraphRevision,
    /// Operations, applied in order
    pub ops: Vec<GraphOp>,
}

impl GraphPatch {
    /// Create a patch from a list of operations
    pub fn new(ops: Vec<GraphOp>) -> Self {
        Self {
            schema_version: SchemaVersion::V0,
            revision: GraphRevision::default(),
            ops,
        }
    }
}

/// A complete node and edge listing
///
/// Returned by the store as its current state, and pushed by producers as
/// their entire contribution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    /// Wire schema version
    #[serde(default)]
    pub schema_version: SchemaVersion,
    /// Store revision, or producer-local revision for producer snapshots
    #[serde(default)]
    pub revision: GraphRevision,
    /// All nodes
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    /// All edges
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl GraphSnapshot {
    /// Create a producer snapshot
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        Self {
            schema_version: SchemaVersion::V0,
            revision: GraphRevision::default(),
            nodes,
            edges,
        }
    }

    /// Look up a node by reference
    pub fn node(&self, node_ref: &NodeRef) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| &node.node_ref() == node_ref)
    }
}

/// Change notification published by the graph store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GraphEvent {
    /// A patch (or snapshot, expressed as a patch) was applied
    Patched {
        /// Revision assigned to the patch
        revision: GraphRevision,
        /// Operations as applied
        ops: Vec<GraphOp>,
    },
    /// The store was cleared
    Reset {
        /// Revision assigned to the reset
        revision: GraphRevision,
    },
}

impl GraphEvent {
    /// Revision carried by the event
    pub fn revision(&self) -> GraphRevision {
        match self {
            GraphEvent::Patched { revision, .. } | GraphEvent::Reset { revision } => *revision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_node_wire_shape() {
        let node = GraphNode::component_type("ui.button", "Button").with_source(SourceRef {
            file_path: "src/Button.tsx".to_string(),
            line: Some(3),
            column: None,
        });

        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({
                "kind": "componentType",
                "id": "ui.button",
                "displayName": "Button",
                "source": { "filePath": "src/Button.tsx", "line": 3 }
            })
        );
    }

    #[test]
    fn test_instance_ref_includes_session() {
        let a = GraphNode::instance("session-a", "inst-1").node_ref();
        let b = GraphNode::instance("session-b", "inst-1").node_ref();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "instance:session-a:inst-1");
    }

    #[test]
    fn test_patch_parses_from_wire() {
        let patch: GraphPatch = serde_json::from_value(json!({
            "schemaVersion": "v0",
            "revision": 12,
            "ops": [
                { "op": "upsertNode", "node": { "kind": "route", "id": "home", "path": "/" } },
                {
                    "op": "removeNode",
                    "node": { "kind": "instance", "sessionId": "s", "instanceId": "i" }
                },
                {
                    "op": "upsertEdge",
                    "edge": { "kind": "routeUsesComponentType", "from": "home", "to": "ui.button" }
                }
            ]
        }))
        .unwrap();

        assert_eq!(patch.revision, GraphRevision(12));
        assert_eq!(patch.ops.len(), 3);
        assert_eq!(
            patch.ops[1],
            GraphOp::RemoveNode {
                node: NodeRef::Instance {
                    session_id: SessionId::new("s"),
                    instance_id: InstanceId::new("i"),
                }
            }
        );
    }

    #[test]
    fn test_unknown_schema_version_is_rejected() {
        let result: Result<GraphSnapshot, _> =
            serde_json::from_value(json!({ "schemaVersion": "v9", "nodes": [], "edges": [] }));
        assert!(result.is_err());
    }
}
