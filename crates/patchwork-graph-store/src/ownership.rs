//! Per-producer ownership sets
//!
//! A producer's contribution is always replaced wholesale: the store records
//! the node and edge keys each producer last sent, and the difference against
//! the next snapshot is what gets removed.

use std::collections::BTreeSet;

use patchwork_core::{GraphEdge, GraphSnapshot, NodeRef};

/// Keys last contributed by one producer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ProducerContribution {
    pub(crate) nodes: BTreeSet<NodeRef>,
    pub(crate) edges: BTreeSet<GraphEdge>,
}

impl ProducerContribution {
    pub(crate) fn from_snapshot(snapshot: &GraphSnapshot) -> Self {
        Self {
            nodes: snapshot.nodes.iter().map(|node| node.node_ref()).collect(),
            edges: snapshot.edges.iter().cloned().collect(),
        }
    }

    /// Node keys owned here but absent from `next`
    pub(crate) fn dropped_nodes<'a>(
        &'a self,
        next: &'a Self,
    ) -> impl Iterator<Item = &'a NodeRef> {
        self.nodes.difference(&next.nodes)
    }

    /// Edge keys owned here but absent from `next`
    pub(crate) fn dropped_edges<'a>(
        &'a self,
        next: &'a Self,
    ) -> impl Iterator<Item = &'a GraphEdge> {
        self.edges.difference(&next.edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchwork_core::GraphNode;

    #[test]
    fn test_dropped_keys() {
        let before = ProducerContribution::from_snapshot(&GraphSnapshot::new(
            vec![GraphNode::route_for_path("/"), GraphNode::route_for_path("/about")],
            vec![GraphEdge::RouteUsesComponentType {
                from: "route:/".into(),
                to: "ui.button".into(),
            }],
        ));
        let after = ProducerContribution::from_snapshot(&GraphSnapshot::new(
            vec![GraphNode::route_for_path("/")],
            vec![],
        ));

        let dropped_nodes: Vec<_> = before.dropped_nodes(&after).collect();
        assert_eq!(dropped_nodes, vec![&GraphNode::route_for_path("/about").node_ref()]);
        assert_eq!(before.dropped_edges(&after).count(), 1);
        assert_eq!(after.dropped_nodes(&before).count(), 0);
    }
}
