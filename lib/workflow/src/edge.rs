//! Directed edges between workflow nodes.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// A directed edge: the source node's outputs flow into the target node.
///
/// Authoring fields beyond the endpoints (edge id, animation, markers) are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEdge {
    /// The upstream node.
    pub source: NodeId,
    /// The downstream node.
    pub target: NodeId,
}

impl WorkflowEdge {
    /// Creates an edge from `source` to `target`.
    #[must_use]
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}
