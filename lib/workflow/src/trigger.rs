//! The run-start trigger event.
//!
//! The host creates the run and its steps, then delivers this event
//! (at least once) to start execution.

use crate::edge::WorkflowEdge;
use crate::media::{MediaFile, coerce_media_file};
use crate::node::WorkflowNode;
use mediaflow_core::{ProjectId, RunId, UserId, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Name of the event that requests a workflow run.
pub const WORKFLOW_REQUESTED_EVENT: &str = "studio.workflow.requested";

/// The payload of a workflow-requested event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    pub run_id: RunId,
    pub workflow_id: WorkflowId,
    pub project_id: ProjectId,
    pub user_id: UserId,
    /// Host-side deduplication key; the engine does not interpret it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
    /// Free-form run input; `files` holds the initial media.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<JsonValue>,
}

impl TriggerEvent {
    /// Parses `input.files` into the run's initial input.
    ///
    /// Entries that cannot be coerced into a [`MediaFile`] are dropped; a
    /// missing or non-array `files` yields no files.
    #[must_use]
    pub fn initial_input(&self) -> Vec<MediaFile> {
        self.input
            .as_ref()
            .and_then(|input| input.get("files"))
            .and_then(JsonValue::as_array)
            .map(|files| files.iter().filter_map(coerce_media_file).collect())
            .unwrap_or_default()
    }
}
