//! The run/step persistence surface.
//!
//! The engine treats the store as a key-value update API. [`InMemoryRunStore`]
//! backs the runner binary and the tests.

use crate::execution::{RunPatch, StepPatch, WorkflowRun, WorkflowStep};
use async_trait::async_trait;
use mediaflow_core::RunId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Persistence for runs and steps.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Applies a patch to a run.
    async fn update_run(&self, run_id: &RunId, patch: RunPatch) -> Result<(), StoreError>;

    /// Applies a patch to every step of `run_id` at `order`.
    ///
    /// Matching no step is not an error.
    async fn update_steps_by_order(
        &self,
        run_id: &RunId,
        order: usize,
        patch: StepPatch,
    ) -> Result<(), StoreError>;

    /// Loads a run.
    async fn find_run(&self, run_id: &RunId) -> Result<Option<WorkflowRun>, StoreError>;
}

/// Errors from store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The run does not exist.
    RunNotFound { run_id: RunId },
    /// The patch would move a run out of a terminal state.
    InvalidTransition {
        run_id: RunId,
        from: &'static str,
        to: &'static str,
    },
    /// The backing store failed.
    Unavailable { message: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunNotFound { run_id } => write!(f, "run not found: {run_id}"),
            Self::InvalidTransition { run_id, from, to } => {
                write!(f, "run {run_id} cannot move from {from} to {to}")
            }
            Self::Unavailable { message } => write!(f, "store unavailable: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[derive(Debug, Default)]
struct Records {
    runs: HashMap<RunId, WorkflowRun>,
    steps: Vec<WorkflowStep>,
}

/// In-memory run store.
///
/// Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRunStore {
    records: Arc<Mutex<Records>>,
}

impl InMemoryRunStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a run with one pending step per node.
    pub async fn insert_run(&self, run: WorkflowRun, step_count: usize) {
        let mut records = self.records.lock().await;
        records.steps.retain(|s| s.run_id != run.id);
        records
            .steps
            .extend((0..step_count).map(|order| WorkflowStep::pending(run.id.clone(), order)));
        records.runs.insert(run.id.clone(), run);
    }

    /// Returns a snapshot of a run.
    pub async fn run(&self, run_id: &RunId) -> Option<WorkflowRun> {
        self.records.lock().await.runs.get(run_id).cloned()
    }

    /// Returns a snapshot of a run's steps in order.
    pub async fn steps(&self, run_id: &RunId) -> Vec<WorkflowStep> {
        let records = self.records.lock().await;
        let mut steps: Vec<_> = records
            .steps
            .iter()
            .filter(|s| &s.run_id == run_id)
            .cloned()
            .collect();
        steps.sort_by_key(|s| s.order);
        steps
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn update_run(&self, run_id: &RunId, patch: RunPatch) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        let run = records
            .runs
            .get_mut(run_id)
            .ok_or_else(|| StoreError::RunNotFound {
                run_id: run_id.clone(),
            })?;

        if !run.state.can_transition_to(patch.state) {
            return Err(StoreError::InvalidTransition {
                run_id: run_id.clone(),
                from: run.state.as_str(),
                to: patch.state.as_str(),
            });
        }

        run.apply(patch);
        Ok(())
    }

    async fn update_steps_by_order(
        &self,
        run_id: &RunId,
        order: usize,
        patch: StepPatch,
    ) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        for step in records
            .steps
            .iter_mut()
            .filter(|s| &s.run_id == run_id && s.order == order)
        {
            step.apply(patch.clone());
        }
        Ok(())
    }

    async fn find_run(&self, run_id: &RunId) -> Result<Option<WorkflowRun>, StoreError> {
        Ok(self.records.lock().await.runs.get(run_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{RunState, StepState};
    use chrono::Utc;
    use mediaflow_core::{ProjectId, UserId, WorkflowId};

    fn run(id: &str) -> WorkflowRun {
        WorkflowRun::new(
            RunId::from(id),
            WorkflowId::from("wf"),
            ProjectId::from("prj"),
            UserId::from("usr"),
        )
    }

    #[tokio::test]
    async fn update_run_enforces_terminal_states() {
        let store = InMemoryRunStore::new();
        let id = RunId::from("run_a");
        store.insert_run(run("run_a"), 0).await;

        store.update_run(&id, RunPatch::running(Utc::now())).await.unwrap();
        store
            .update_run(&id, RunPatch::completed(Utc::now(), serde_json::json!({})))
            .await
            .unwrap();

        let err = store
            .update_run(&id, RunPatch::running(Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        assert_eq!(store.run(&id).await.unwrap().state, RunState::Completed);
    }

    #[tokio::test]
    async fn update_missing_run_fails() {
        let store = InMemoryRunStore::new();
        let err = store
            .update_run(&RunId::from("nope"), RunPatch::running(Utc::now()))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::RunNotFound {
                run_id: RunId::from("nope")
            }
        );
    }

    #[tokio::test]
    async fn step_updates_by_order_touch_only_matching_steps() {
        let store = InMemoryRunStore::new();
        let id = RunId::from("run_b");
        store.insert_run(run("run_b"), 3).await;
        store.insert_run(run("run_c"), 3).await;

        store
            .update_steps_by_order(&id, 1, StepPatch::running(Utc::now()))
            .await
            .unwrap();
        store
            .update_steps_by_order(&id, 7, StepPatch::running(Utc::now()))
            .await
            .unwrap();

        let states: Vec<_> = store.steps(&id).await.iter().map(|s| s.state).collect();
        assert_eq!(
            states,
            vec![StepState::Pending, StepState::Running, StepState::Pending]
        );
        let other = store.steps(&RunId::from("run_c")).await;
        assert!(other.iter().all(|s| s.state == StepState::Pending));
    }
}
