//! Plugin resolution for nodes.
//!
//! The authoritative source is the node's explicit `pluginId`. Workflows
//! authored before plugin ids existed are bound through
//! [`infer_plugin_id`], a migration aid that guesses from the node type,
//! category and label.

use crate::error::PluginResolutionError;
use crate::node::WorkflowNode;

/// Resolves the plugin id for `node`.
///
/// # Errors
///
/// Returns [`PluginResolutionError::MissingPluginId`] if the node has no
/// explicit id and no heuristic matches.
pub fn resolve_plugin_id(node: &WorkflowNode) -> Result<String, PluginResolutionError> {
    if let Some(explicit) = node.data.plugin_id.as_deref()
        && !explicit.is_empty()
    {
        return Ok(explicit.to_string());
    }

    infer_plugin_id(node)
        .map(str::to_string)
        .ok_or_else(|| PluginResolutionError::MissingPluginId {
            node_id: node.id.clone(),
            label: node.display_name().to_string(),
        })
}

/// Migration aid: guesses a plugin id from legacy node metadata.
///
/// Not used when a node carries an explicit plugin id.
#[must_use]
pub fn infer_plugin_id(node: &WorkflowNode) -> Option<&'static str> {
    let label = node.data.label.to_lowercase();
    let category = node
        .data
        .category
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_default();

    if node.node_type.as_deref() == Some("trigger") || category == "input" {
        return Some("media-input");
    }
    if label.contains("remove bg") || label.contains("remove background") {
        return Some("background-removal");
    }
    if label.contains("resize") || label.contains("crop") {
        return Some("image-resize");
    }
    if label.contains("convert") || label.contains("format") {
        return Some("format-conversion");
    }
    None
}
