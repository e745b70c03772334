//! Workflow node records as authored in the editor.
//!
//! Only the fields the engine reads are modeled; other authoring fields
//! (position, icon, status) are accepted and ignored on deserialization.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Reads an explicit `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A node identifier, unique within one workflow.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A step in a workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// The node's identifier.
    pub id: NodeId,
    /// Editor node type, e.g. `trigger` or `default`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    /// Authoring data.
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: NodeData,
}

/// The data payload of a node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    /// Human-readable label.
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    /// The plugin implementing this node, if assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_id: Option<String>,
    /// Raw plugin configuration, validated at execution time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<JsonValue>,
    /// Palette category the node was dragged from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl WorkflowNode {
    /// Creates a node with the given label and no plugin assignment.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: None,
            data: NodeData {
                label: label.into(),
                ..NodeData::default()
            },
        }
    }

    /// Assigns the plugin for this node.
    #[must_use]
    pub fn with_plugin(mut self, plugin_id: impl Into<String>) -> Self {
        self.data.plugin_id = Some(plugin_id.into());
        self
    }

    /// Sets the raw configuration.
    #[must_use]
    pub fn with_config(mut self, config: JsonValue) -> Self {
        self.data.config = Some(config);
        self
    }

    /// Sets the editor node type.
    #[must_use]
    pub fn with_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    /// Sets the palette category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.data.category = Some(category.into());
        self
    }

    /// Returns the label, or the id when the label is empty.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.data.label.is_empty() {
            self.id.as_str()
        } else {
            &self.data.label
        }
    }

    /// Returns the raw config as an object, or `{}` when absent or not an object.
    #[must_use]
    pub fn raw_config(&self) -> JsonValue {
        match &self.data.config {
            Some(config @ JsonValue::Object(_)) => config.clone(),
            _ => JsonValue::Object(serde_json::Map::new()),
        }
    }
}
