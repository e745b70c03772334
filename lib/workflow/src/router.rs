//! Per-node input routing.
//!
//! A node with no incoming edges receives the run's initial input. Otherwise
//! it receives the concatenation of its sources' outputs in edge-list order.
//! Files are not de-duplicated or merged by id; colliding ids are logged.

use crate::graph::WorkflowGraph;
use crate::media::MediaFile;
use crate::node::NodeId;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Outputs of completed nodes within one run, alongside the initial input.
///
/// Written once per node by the sequential executor, read by the router.
#[derive(Debug, Clone, Default)]
pub struct ResultsByNode {
    initial: Vec<MediaFile>,
    outputs: HashMap<NodeId, Vec<MediaFile>>,
}

impl ResultsByNode {
    /// Creates an empty map carrying the run's initial input.
    #[must_use]
    pub fn seeded(initial_input: Vec<MediaFile>) -> Self {
        Self {
            initial: initial_input,
            outputs: HashMap::new(),
        }
    }

    /// Records a node's outputs.
    pub fn insert(&mut self, node_id: &NodeId, files: Vec<MediaFile>) {
        self.outputs.insert(node_id.clone(), files);
    }

    /// Returns a node's outputs, if it has completed.
    #[must_use]
    pub fn get(&self, node_id: &NodeId) -> Option<&[MediaFile]> {
        self.outputs.get(node_id).map(Vec::as_slice)
    }

    /// Returns the initial input.
    #[must_use]
    pub fn initial_input(&self) -> &[MediaFile] {
        &self.initial
    }

    /// Concatenates the outputs of `node_ids` in the given order.
    #[must_use]
    pub fn concat<'a>(&self, node_ids: impl IntoIterator<Item = &'a NodeId>) -> Vec<MediaFile> {
        node_ids
            .into_iter()
            .filter_map(|id| self.get(id))
            .flat_map(|files| files.iter().cloned())
            .collect()
    }
}

/// Computes the input files for `node_id`.
#[must_use]
pub fn inputs_for(node_id: &NodeId, graph: &WorkflowGraph, results: &ResultsByNode) -> Vec<MediaFile> {
    let sources = graph.incoming_sources(node_id);
    if sources.is_empty() {
        return results.initial_input().to_vec();
    }

    let combined = results.concat(sources);
    warn_on_colliding_ids(node_id, &combined);
    combined
}

fn warn_on_colliding_ids(node_id: &NodeId, files: &[MediaFile]) {
    let mut seen = HashSet::with_capacity(files.len());
    for file in files {
        if !seen.insert(file.id.as_str()) {
            warn!(node_id = %node_id, file_id = %file.id, "fan-in delivered files with the same id");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::WorkflowEdge;
    use crate::media::MediaType;
    use crate::node::WorkflowNode;

    fn file(id: &str) -> MediaFile {
        MediaFile::new(id, format!("memory://{id}"), format!("{id}.png"), MediaType::Image)
    }

    fn ids(files: &[MediaFile]) -> Vec<&str> {
        files.iter().map(|f| f.id.as_str()).collect()
    }

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> WorkflowGraph {
        let nodes: Vec<_> = nodes.iter().map(|id| WorkflowNode::new(*id, *id)).collect();
        let edges: Vec<_> = edges.iter().map(|(s, t)| WorkflowEdge::new(*s, *t)).collect();
        WorkflowGraph::from_parts(&nodes, &edges).unwrap()
    }

    #[test]
    fn entry_node_receives_initial_input() {
        let graph = graph(&["a", "b"], &[("a", "b")]);
        let results = ResultsByNode::seeded(vec![file("i1"), file("i2")]);

        let inputs = inputs_for(&NodeId::from("a"), &graph, &results);
        assert_eq!(ids(&inputs), vec!["i1", "i2"]);
    }

    #[test]
    fn fan_in_concatenates_in_edge_list_order() {
        let graph = graph(&["a", "b", "c"], &[("a", "c"), ("b", "c")]);
        let mut results = ResultsByNode::seeded(vec![file("initial")]);
        results.insert(&NodeId::from("a"), vec![file("f1")]);
        results.insert(&NodeId::from("b"), vec![file("f2")]);

        let inputs = inputs_for(&NodeId::from("c"), &graph, &results);
        assert_eq!(ids(&inputs), vec!["f1", "f2"]);
    }

    #[test]
    fn fan_in_order_tracks_edges_not_nodes() {
        let graph = graph(&["a", "b", "c"], &[("b", "c"), ("a", "c")]);
        let mut results = ResultsByNode::default();
        results.insert(&NodeId::from("a"), vec![file("f1")]);
        results.insert(&NodeId::from("b"), vec![file("f2"), file("f3")]);

        let inputs = inputs_for(&NodeId::from("c"), &graph, &results);
        assert_eq!(ids(&inputs), vec!["f2", "f3", "f1"]);
    }

    #[test]
    fn colliding_ids_are_kept() {
        let graph = graph(&["a", "b", "c"], &[("a", "c"), ("b", "c")]);
        let mut results = ResultsByNode::default();
        results.insert(&NodeId::from("a"), vec![file("same")]);
        results.insert(&NodeId::from("b"), vec![file("same")]);

        let inputs = inputs_for(&NodeId::from("c"), &graph, &results);
        assert_eq!(ids(&inputs), vec!["same", "same"]);
    }

    #[test]
    fn node_outputs_never_replace_initial_input() {
        let graph = graph(&["__initial__", "b"], &[]);
        let mut results = ResultsByNode::seeded(vec![file("upload")]);
        results.insert(&NodeId::from("__initial__"), vec![file("f1")]);

        let inputs = inputs_for(&NodeId::from("b"), &graph, &results);
        assert_eq!(ids(&inputs), vec!["upload"]);
    }

    #[test]
    fn downstream_of_empty_output_gets_nothing() {
        let graph = graph(&["a", "b"], &[("a", "b")]);
        let mut results = ResultsByNode::seeded(vec![file("initial")]);
        results.insert(&NodeId::from("a"), Vec::new());

        assert!(inputs_for(&NodeId::from("b"), &graph, &results).is_empty());
    }
}
