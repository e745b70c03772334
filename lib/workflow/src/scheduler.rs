//! Topological scheduling of a workflow graph.
//!
//! Kahn's algorithm with a FIFO queue. Ties are broken by authoring order:
//! the queue is seeded in node-array order and successors are released in
//! edge-list order, so the same payload always yields the same order.

use crate::edge::WorkflowEdge;
use crate::error::GraphError;
use crate::graph::WorkflowGraph;
use crate::node::{NodeId, WorkflowNode};
use std::collections::{HashMap, VecDeque};

/// Computes the execution order for authored nodes and edges.
///
/// # Errors
///
/// Returns a [`GraphError`] if the graph has a cycle, a duplicate node id or
/// an edge to an unknown node.
pub fn execution_order(
    nodes: &[WorkflowNode],
    edges: &[WorkflowEdge],
) -> Result<Vec<NodeId>, GraphError> {
    let graph = WorkflowGraph::from_parts(nodes, edges)?;
    order(&graph)
}

/// Orders every node of `graph` so each edge's source precedes its target.
///
/// # Errors
///
/// Returns [`GraphError::CycleDetected`] listing the nodes that could not be
/// ordered.
pub fn order(graph: &WorkflowGraph) -> Result<Vec<NodeId>, GraphError> {
    let mut in_degree: HashMap<&NodeId, usize> = graph
        .node_ids()
        .map(|id| (id, graph.in_degree(id)))
        .collect();

    let mut queue: VecDeque<&NodeId> = graph
        .node_ids()
        .filter(|id| in_degree.get(id).copied() == Some(0))
        .collect();
    let mut result = Vec::with_capacity(graph.node_count());

    while let Some(current) = queue.pop_front() {
        result.push(current.clone());
        for neighbor in graph.outgoing_targets(current) {
            if let Some(degree) = in_degree.get_mut(neighbor) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(neighbor);
                }
            }
        }
    }

    if result.len() != graph.node_count() {
        let unscheduled = graph
            .node_ids()
            .filter(|id| in_degree.get(id).is_some_and(|d| *d > 0))
            .cloned()
            .collect();
        return Err(GraphError::CycleDetected { unscheduled });
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(ids: &[&str]) -> Vec<WorkflowNode> {
        ids.iter().map(|id| WorkflowNode::new(*id, *id)).collect()
    }

    fn edges(pairs: &[(&str, &str)]) -> Vec<WorkflowEdge> {
        pairs.iter().map(|(s, t)| WorkflowEdge::new(*s, *t)).collect()
    }

    fn ids(order: &[NodeId]) -> Vec<&str> {
        order.iter().map(NodeId::as_str).collect()
    }

    fn assert_respects_edges(order: &[NodeId], edges: &[WorkflowEdge]) {
        let position = |id: &NodeId| order.iter().position(|o| o == id).unwrap();
        for edge in edges {
            assert!(
                position(&edge.source) < position(&edge.target),
                "{} must run before {}",
                edge.source,
                edge.target
            );
        }
    }

    #[test]
    fn linear_chain_in_order() {
        let order = execution_order(&nodes(&["a", "b", "c"]), &edges(&[("a", "b"), ("b", "c")]))
            .unwrap();
        assert_eq!(ids(&order), vec!["a", "b", "c"]);
    }

    #[test]
    fn ties_follow_node_array_order() {
        let order = execution_order(&nodes(&["z", "y", "x"]), &[]).unwrap();
        assert_eq!(ids(&order), vec!["z", "y", "x"]);
    }

    #[test]
    fn successors_released_in_edge_list_order() {
        let order = execution_order(
            &nodes(&["root", "left", "right"]),
            &edges(&[("root", "right"), ("root", "left")]),
        )
        .unwrap();
        assert_eq!(ids(&order), vec!["root", "right", "left"]);
    }

    #[test]
    fn order_respects_every_edge() {
        let cases = [
            (
                nodes(&["e", "d", "c", "b", "a"]),
                edges(&[("a", "b"), ("b", "c"), ("a", "d"), ("d", "e"), ("c", "e")]),
            ),
            (
                nodes(&["sink", "mid1", "mid2", "src"]),
                edges(&[("src", "mid1"), ("src", "mid2"), ("mid1", "sink"), ("mid2", "sink")]),
            ),
            (
                nodes(&["a", "b", "c", "d"]),
                edges(&[("a", "c"), ("a", "c"), ("b", "c"), ("c", "d")]),
            ),
        ];

        for (nodes, edges) in cases {
            let order = execution_order(&nodes, &edges).unwrap();
            assert_eq!(order.len(), nodes.len());
            let mut sorted = ids(&order);
            sorted.sort_unstable();
            let mut expected: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
            expected.sort_unstable();
            assert_eq!(sorted, expected, "order must be a permutation");
            assert_respects_edges(&order, &edges);
        }
    }

    #[test]
    fn cycle_is_rejected() {
        let result = execution_order(
            &nodes(&["a", "b", "c", "d"]),
            &edges(&[("a", "b"), ("b", "c"), ("c", "b"), ("c", "d")]),
        );
        match result {
            Err(GraphError::CycleDetected { unscheduled }) => {
                assert_eq!(ids(&unscheduled), vec!["b", "c", "d"]);
            }
            other => panic!("expected CycleDetected, got {other:?}"),
        }
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let result = execution_order(&nodes(&["a"]), &edges(&[("a", "a")]));
        assert!(matches!(result, Err(GraphError::CycleDetected { .. })));
    }
}
