//! Workflow graph implementation using petgraph.
//!
//! The graph is rebuilt from the trigger payload for every run:
//! - Node indices follow node-array order
//! - Edge weights are edge-list positions, so the authoring order of edges can
//!   be recovered regardless of how petgraph iterates adjacency

use crate::edge::WorkflowEdge;
use crate::error::GraphError;
use crate::node::{NodeId, WorkflowNode};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// A validated node/edge set ready for scheduling and routing.
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    /// The underlying directed graph. Edge weights are edge-list positions.
    graph: DiGraph<NodeId, usize>,
    /// Map from NodeId to petgraph's NodeIndex for O(1) lookup.
    node_index_map: HashMap<NodeId, NodeIndex>,
}

impl WorkflowGraph {
    /// Builds the graph from authored nodes and edges.
    ///
    /// # Errors
    ///
    /// Returns an error if a node id is duplicated or an edge references a
    /// node id that is not in `nodes`.
    pub fn from_parts(nodes: &[WorkflowNode], edges: &[WorkflowEdge]) -> Result<Self, GraphError> {
        let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
        let mut node_index_map = HashMap::with_capacity(nodes.len());

        for node in nodes {
            if node_index_map.contains_key(&node.id) {
                return Err(GraphError::DuplicateNode {
                    node_id: node.id.clone(),
                });
            }
            let index = graph.add_node(node.id.clone());
            node_index_map.insert(node.id.clone(), index);
        }

        for (position, edge) in edges.iter().enumerate() {
            let lookup = |id: &NodeId| {
                node_index_map
                    .get(id)
                    .copied()
                    .ok_or_else(|| GraphError::UnresolvedReference {
                        source: edge.source.clone(),
                        target: edge.target.clone(),
                        missing: id.clone(),
                    })
            };
            let source = lookup(&edge.source)?;
            let target = lookup(&edge.target)?;
            graph.add_edge(source, target, position);
        }

        Ok(Self {
            graph,
            node_index_map,
        })
    }

    /// Returns the node ids in node-array order.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.graph.node_weights()
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns the number of incoming edges of a node.
    #[must_use]
    pub fn in_degree(&self, node_id: &NodeId) -> usize {
        self.node_index_map.get(node_id).map_or(0, |&index| {
            self.graph.edges_directed(index, Direction::Incoming).count()
        })
    }

    /// Returns the source of every edge into `node_id`, in edge-list order.
    ///
    /// Parallel edges from the same source appear once per edge.
    #[must_use]
    pub fn incoming_sources(&self, node_id: &NodeId) -> Vec<&NodeId> {
        self.neighbors_in_edge_order(node_id, Direction::Incoming)
    }

    /// Returns the target of every edge out of `node_id`, in edge-list order.
    #[must_use]
    pub fn outgoing_targets(&self, node_id: &NodeId) -> Vec<&NodeId> {
        self.neighbors_in_edge_order(node_id, Direction::Outgoing)
    }

    /// Returns nodes that have no incoming edges, in node-array order.
    #[must_use]
    pub fn entry_node_ids(&self) -> Vec<&NodeId> {
        self.nodes_without(Direction::Incoming)
    }

    /// Returns nodes that are never an edge source, in node-array order.
    #[must_use]
    pub fn sink_node_ids(&self) -> Vec<&NodeId> {
        self.nodes_without(Direction::Outgoing)
    }

    fn nodes_without(&self, direction: Direction) -> Vec<&NodeId> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph.edges_directed(idx, direction).next().is_none())
            .filter_map(|idx| self.graph.node_weight(idx))
            .collect()
    }

    fn neighbors_in_edge_order(&self, node_id: &NodeId, direction: Direction) -> Vec<&NodeId> {
        let Some(&index) = self.node_index_map.get(node_id) else {
            return Vec::new();
        };

        let mut edges: Vec<_> = self.graph.edges_directed(index, direction).collect();
        edges.sort_by_key(|edge| *edge.weight());
        edges
            .into_iter()
            .filter_map(|edge| {
                let other = match direction {
                    Direction::Incoming => edge.source(),
                    Direction::Outgoing => edge.target(),
                };
                self.graph.node_weight(other)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(ids: &[&str]) -> Vec<WorkflowNode> {
        ids.iter().map(|id| WorkflowNode::new(*id, *id)).collect()
    }

    #[test]
    fn incoming_sources_follow_edge_list_order() {
        let graph = WorkflowGraph::from_parts(
            &nodes(&["a", "b", "c"]),
            &[
                WorkflowEdge::new("b", "c"),
                WorkflowEdge::new("a", "c"),
                WorkflowEdge::new("b", "c"),
            ],
        )
        .unwrap();

        let sources: Vec<&str> = graph
            .incoming_sources(&NodeId::from("c"))
            .into_iter()
            .map(NodeId::as_str)
            .collect();
        assert_eq!(sources, vec!["b", "a", "b"]);
        assert_eq!(graph.in_degree(&NodeId::from("c")), 3);
    }

    #[test]
    fn entry_and_sink_nodes() {
        let graph = WorkflowGraph::from_parts(
            &nodes(&["a", "b", "c", "d"]),
            &[WorkflowEdge::new("a", "b"), WorkflowEdge::new("a", "c")],
        )
        .unwrap();

        let entries: Vec<&str> = graph.entry_node_ids().into_iter().map(NodeId::as_str).collect();
        let sinks: Vec<&str> = graph.sink_node_ids().into_iter().map(NodeId::as_str).collect();
        assert_eq!(entries, vec!["a", "d"]);
        assert_eq!(sinks, vec!["b", "c", "d"]);
    }

    #[test]
    fn rejects_duplicate_node_ids() {
        let result = WorkflowGraph::from_parts(&nodes(&["a", "a"]), &[]);
        assert!(matches!(result, Err(GraphError::DuplicateNode { .. })));
    }

    #[test]
    fn rejects_edges_to_unknown_nodes() {
        let result = WorkflowGraph::from_parts(&nodes(&["a"]), &[WorkflowEdge::new("a", "ghost")]);
        match result {
            Err(GraphError::UnresolvedReference { missing, .. }) => {
                assert_eq!(missing, NodeId::from("ghost"));
            }
            other => panic!("expected UnresolvedReference, got {other:?}"),
        }
    }
}
