//! Error types for the workflow crate.
//!
//! Errors are layered the same way the engine is:
//! - `GraphError`: the node/edge set cannot be scheduled
//! - `PluginResolutionError` / `ConfigValidationError`: a node cannot be bound
//!   to a runnable plugin
//! - `EngineError`: everything that aborts a run, wrapping the lower errors

use crate::node::NodeId;
use crate::plugin::PluginError;
use crate::store::StoreError;
use mediaflow_core::StepError;
use std::fmt;

/// Errors from scheduling the workflow graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The same node id appears twice in the node array.
    DuplicateNode { node_id: NodeId },
    /// An edge references a node id that is not in the node array.
    UnresolvedReference {
        source: NodeId,
        target: NodeId,
        missing: NodeId,
    },
    /// Kahn's algorithm could not order these nodes.
    CycleDetected { unscheduled: Vec<NodeId> },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("workflow graph contains a cycle or unresolved references")?;
        match self {
            Self::DuplicateNode { node_id } => write!(f, ": duplicate node id {node_id}"),
            Self::UnresolvedReference {
                source,
                target,
                missing,
            } => write!(f, ": edge {source} -> {target} references unknown node {missing}"),
            Self::CycleDetected { unscheduled } => {
                let ids: Vec<&str> = unscheduled.iter().map(NodeId::as_str).collect();
                write!(f, ": could not order [{}]", ids.join(", "))
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// A node could not be bound to a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginResolutionError {
    /// No explicit plugin id and no heuristic match.
    MissingPluginId { node_id: NodeId, label: String },
    /// The resolved plugin id is not registered.
    UnknownPlugin {
        node_id: NodeId,
        label: String,
        plugin_id: String,
    },
}

impl fmt::Display for PluginResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPluginId { label, .. } => write!(
                f,
                "node \"{label}\" is missing pluginId; assign a module implementation before running"
            ),
            Self::UnknownPlugin {
                label, plugin_id, ..
            } => write!(f, "node \"{label}\" references unknown plugin '{plugin_id}'"),
        }
    }
}

impl std::error::Error for PluginResolutionError {}

/// A node's configuration failed its plugin's schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    /// The plugin whose schema rejected the config.
    pub plugin_id: String,
    /// The offending field, when known.
    pub field: Option<String>,
    /// What was wrong.
    pub reason: String,
}

impl ConfigValidationError {
    /// Creates an error for a specific field.
    #[must_use]
    pub fn field(
        plugin_id: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            field: Some(field.into()),
            reason: reason.into(),
        }
    }

    /// Creates an error for the config as a whole.
    #[must_use]
    pub fn shape(plugin_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            field: None,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(
                f,
                "invalid config for plugin '{}': {field}: {}",
                self.plugin_id, self.reason
            ),
            None => write!(
                f,
                "invalid config for plugin '{}': {}",
                self.plugin_id, self.reason
            ),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Errors that abort a workflow run.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The graph cannot be ordered; nothing executed.
    GraphCycle(GraphError),
    /// A node has no determinable plugin.
    PluginResolution(PluginResolutionError),
    /// A node's config failed validation.
    ConfigValidation(ConfigValidationError),
    /// A plugin's `run` failed.
    PluginExecution {
        node_id: NodeId,
        plugin_id: String,
        source: PluginError,
    },
    /// The run/step store rejected an update.
    Persistence(StoreError),
    /// The step substrate failed to record or replay a result.
    Step(StepError),
}

impl EngineError {
    /// Builds a [`EngineError::PluginExecution`] for a node.
    #[must_use]
    pub fn plugin(node_id: &NodeId, plugin_id: &str, source: PluginError) -> Self {
        Self::PluginExecution {
            node_id: node_id.clone(),
            plugin_id: plugin_id.to_string(),
            source,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GraphCycle(e) => write!(f, "{e}"),
            Self::PluginResolution(e) => write!(f, "{e}"),
            Self::ConfigValidation(e) => write!(f, "{e}"),
            Self::PluginExecution {
                node_id,
                plugin_id,
                source,
            } => write!(f, "plugin '{plugin_id}' failed on node {node_id}: {source}"),
            Self::Persistence(e) => write!(f, "persistence error: {e}"),
            Self::Step(e) => write!(f, "step error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::GraphCycle(e) => Some(e),
            Self::PluginResolution(e) => Some(e),
            Self::ConfigValidation(e) => Some(e),
            Self::PluginExecution { source, .. } => Some(source),
            Self::Persistence(e) => Some(e),
            Self::Step(e) => Some(e),
        }
    }
}

impl From<GraphError> for EngineError {
    fn from(e: GraphError) -> Self {
        Self::GraphCycle(e)
    }
}

impl From<PluginResolutionError> for EngineError {
    fn from(e: PluginResolutionError) -> Self {
        Self::PluginResolution(e)
    }
}

impl From<ConfigValidationError> for EngineError {
    fn from(e: ConfigValidationError) -> Self {
        Self::ConfigValidation(e)
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        Self::Persistence(e)
    }
}

impl From<StepError> for EngineError {
    fn from(e: StepError) -> Self {
        Self::Step(e)
    }
}
