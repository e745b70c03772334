//! Run and step records and their state machines.
//!
//! A run moves `PENDING -> RUNNING -> {COMPLETED | FAILED}` and never leaves a
//! terminal state. Steps are created alongside the run (all `PENDING`) and are
//! keyed by `(run_id, order)`, where `order` is the node's position in the
//! authored node array.

use crate::media::MediaFile;
use crate::node::NodeId;
use chrono::{DateTime, Utc};
use mediaflow_core::{ProjectId, RunId, UserId, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// The overall state of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    /// Created by the host, not yet claimed.
    Pending,
    /// Claimed and executing.
    Running,
    /// Every node completed.
    Completed,
    /// A node or the engine failed.
    Failed,
}

impl RunState {
    /// Returns true if this is a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if a run in this state may be moved to `next`.
    ///
    /// `RUNNING -> RUNNING` is allowed so a redelivered run can be re-claimed.
    #[must_use]
    pub fn can_transition_to(&self, next: RunState) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Running | Self::Failed),
            Self::Running => true,
            Self::Completed | Self::Failed => false,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

/// The state of one step (one node within one run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl StepState {
    /// Returns true if this is a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// The error recorded on a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    pub message: String,
}

/// A record of a single workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRun {
    pub id: RunId,
    pub workflow_id: WorkflowId,
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub state: RunState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Final output, once completed. Hosts may pre-populate it.
    pub output: Option<JsonValue>,
    pub error: Option<RunError>,
}

impl WorkflowRun {
    /// Creates a run record in the pending state.
    #[must_use]
    pub fn new(id: RunId, workflow_id: WorkflowId, project_id: ProjectId, user_id: UserId) -> Self {
        Self {
            id,
            workflow_id,
            project_id,
            user_id,
            state: RunState::Pending,
            started_at: None,
            finished_at: None,
            output: None,
            error: None,
        }
    }

    /// Applies a patch to the record.
    pub fn apply(&mut self, patch: RunPatch) {
        self.state = patch.state;
        if patch.started_at.is_some() {
            self.started_at = patch.started_at;
        }
        if patch.finished_at.is_some() {
            self.finished_at = patch.finished_at;
        }
        if patch.output.is_some() {
            self.output = patch.output;
        }
        match patch.error {
            ErrorUpdate::Keep => {}
            ErrorUpdate::Clear => self.error = None,
            ErrorUpdate::Set(error) => self.error = Some(error),
        }
    }
}

/// How a [`RunPatch`] treats the stored error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ErrorUpdate {
    #[default]
    Keep,
    Clear,
    Set(RunError),
}

/// A partial update of a run record.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPatch {
    pub state: RunState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub output: Option<JsonValue>,
    pub error: ErrorUpdate,
}

impl RunPatch {
    /// Claims the run: `RUNNING`, start time set, previous error cleared.
    #[must_use]
    pub fn running(at: DateTime<Utc>) -> Self {
        Self {
            state: RunState::Running,
            started_at: Some(at),
            finished_at: None,
            output: None,
            error: ErrorUpdate::Clear,
        }
    }

    /// Completes the run with its final output.
    #[must_use]
    pub fn completed(at: DateTime<Utc>, output: JsonValue) -> Self {
        Self {
            state: RunState::Completed,
            started_at: None,
            finished_at: Some(at),
            output: Some(output),
            error: ErrorUpdate::Keep,
        }
    }

    /// Fails the run with a message.
    #[must_use]
    pub fn failed(at: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            state: RunState::Failed,
            started_at: None,
            finished_at: Some(at),
            output: None,
            error: ErrorUpdate::Set(RunError {
                message: message.into(),
            }),
        }
    }
}

/// A step record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub run_id: RunId,
    /// Node-array position of the node this step tracks.
    pub order: usize,
    pub state: StepState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub output: Option<JsonValue>,
}

impl WorkflowStep {
    /// Creates a pending step.
    #[must_use]
    pub fn pending(run_id: RunId, order: usize) -> Self {
        Self {
            run_id,
            order,
            state: StepState::Pending,
            started_at: None,
            finished_at: None,
            output: None,
        }
    }

    /// Applies a patch to the record.
    pub fn apply(&mut self, patch: StepPatch) {
        self.state = patch.state;
        if patch.started_at.is_some() {
            self.started_at = patch.started_at;
        }
        if patch.finished_at.is_some() {
            self.finished_at = patch.finished_at;
        }
        if patch.output.is_some() {
            self.output = patch.output;
        }
    }
}

/// A partial update of a step record.
#[derive(Debug, Clone, PartialEq)]
pub struct StepPatch {
    pub state: StepState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub output: Option<JsonValue>,
}

impl StepPatch {
    #[must_use]
    pub fn running(at: DateTime<Utc>) -> Self {
        Self {
            state: StepState::Running,
            started_at: Some(at),
            finished_at: None,
            output: None,
        }
    }

    #[must_use]
    pub fn completed(at: DateTime<Utc>, output: JsonValue) -> Self {
        Self {
            state: StepState::Completed,
            started_at: None,
            finished_at: Some(at),
            output: Some(output),
        }
    }
}

/// What a completed step records as its output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutput {
    pub node_id: NodeId,
    pub plugin_id: String,
    /// The normalized config the plugin ran with.
    pub config: JsonValue,
    pub inputs: Vec<MediaFile>,
    pub outputs: Vec<MediaFile>,
    pub metadata: Map<String, JsonValue>,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> WorkflowRun {
        WorkflowRun::new(
            RunId::from("run_1"),
            WorkflowId::from("wf_1"),
            ProjectId::from("prj_1"),
            UserId::from("usr_1"),
        )
    }

    #[test]
    fn terminal_states_cannot_be_left() {
        assert!(RunState::Pending.can_transition_to(RunState::Running));
        assert!(RunState::Running.can_transition_to(RunState::Completed));
        assert!(!RunState::Completed.can_transition_to(RunState::Running));
        assert!(!RunState::Failed.can_transition_to(RunState::Failed));
        assert!(!RunState::Pending.can_transition_to(RunState::Completed));
    }

    #[test]
    fn running_patch_clears_error() {
        let mut run = run();
        run.error = Some(RunError {
            message: "old".to_string(),
        });
        let now = Utc::now();

        run.apply(RunPatch::running(now));

        assert_eq!(run.state, RunState::Running);
        assert_eq!(run.started_at, Some(now));
        assert!(run.error.is_none());
    }

    #[test]
    fn failed_patch_keeps_start_time() {
        let mut run = run();
        let started = Utc::now();
        run.apply(RunPatch::running(started));
        run.apply(RunPatch::failed(Utc::now(), "boom"));

        assert_eq!(run.state, RunState::Failed);
        assert_eq!(run.started_at, Some(started));
        assert_eq!(run.error.as_ref().map(|e| e.message.as_str()), Some("boom"));
    }

    #[test]
    fn state_wire_names_are_upper_case() {
        let json = serde_json::to_string(&RunState::Completed).unwrap();
        assert_eq!(json, "\"COMPLETED\"");
        assert_eq!(RunState::Pending.as_str(), "PENDING");
        assert_eq!(serde_json::to_string(&StepState::Running).unwrap(), "\"RUNNING\"");
    }

    #[test]
    fn step_patch_applies() {
        let mut step = WorkflowStep::pending(RunId::from("run_1"), 2);
        step.apply(StepPatch::running(Utc::now()));
        assert_eq!(step.state, StepState::Running);

        step.apply(StepPatch::completed(Utc::now(), serde_json::json!({"ok": true})));
        assert!(step.state.is_terminal());
        assert!(step.started_at.is_some());
        assert_eq!(step.output, Some(serde_json::json!({"ok": true})));
    }
}
