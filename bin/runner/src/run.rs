//! Executes one trigger against the built-in plugins and an in-memory store.

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use mediaflow_ai::UnconfiguredBackend;
use mediaflow_core::MemoizingStepRunner;
use mediaflow_plugins::{HttpMediaFetcher, LocalBlobStore, PluginDeps, builtin_registry};
use mediaflow_workflow::{
    InMemoryRunStore, PluginDescriptor, PluginRegistry, RunController, RunOutcome, RunState,
    TriggerEvent, WorkflowRun, WorkflowStep,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// What the runner prints after a run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run: WorkflowRun,
    pub steps: Vec<WorkflowStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<RunOutcome>,
    /// The engine error, when the run did not complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    /// A run failed if it was marked FAILED, or if the engine gave up before
    /// the run reached a terminal state.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.run.state == RunState::Failed
            || (self.outcome.is_none() && !self.run.state.is_terminal())
    }
}

/// Builds the registry the runner executes with.
///
/// Model-backed plugins are registered against [`UnconfiguredBackend`], so
/// they fail with a not-configured error when a workflow reaches them.
///
/// # Errors
///
/// Returns [`RunnerError::Setup`] if the fetcher or registry cannot be built.
pub fn registry(config: &RunnerConfig) -> Result<PluginRegistry, RunnerError> {
    let fetcher = HttpMediaFetcher::new(config.fetch_timeout()).map_err(|e| RunnerError::Setup {
        details: e.to_string(),
    })?;
    let deps = PluginDeps {
        fetcher: Arc::new(fetcher),
        blobs: Arc::new(LocalBlobStore::new(&config.output_dir)),
        models: Arc::new(UnconfiguredBackend),
        generator: Arc::new(UnconfiguredBackend),
        verifier: Arc::new(UnconfiguredBackend),
    };
    builtin_registry(&deps).map_err(|e| RunnerError::Setup {
        details: e.to_string(),
    })
}

/// Lists the plugins the runner knows about.
///
/// # Errors
///
/// Returns [`RunnerError::Setup`] if the registry cannot be built.
pub fn descriptors(config: &RunnerConfig) -> Result<Vec<PluginDescriptor>, RunnerError> {
    Ok(registry(config)?.descriptors())
}

/// Reads and parses a trigger event file.
///
/// # Errors
///
/// Returns [`RunnerError::ReadTrigger`] or [`RunnerError::ParseTrigger`].
pub async fn load_trigger(path: &Path) -> Result<TriggerEvent, RunnerError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RunnerError::ReadTrigger {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;
    serde_json::from_str(&raw).map_err(|e| RunnerError::ParseTrigger {
        path: path.to_path_buf(),
        details: e.to_string(),
    })
}

/// Seeds a pending run with one step per node, then executes the trigger.
///
/// A failed run is reported, not returned as an error: the report carries
/// the run's FAILED state and message.
///
/// # Errors
///
/// Returns [`RunnerError::Setup`] if the plugin set cannot be built.
pub async fn execute(config: &RunnerConfig, event: &TriggerEvent) -> Result<RunReport, RunnerError> {
    let controller = RunController::new(
        Arc::new(registry(config)?),
        InMemoryRunStore::new(),
        MemoizingStepRunner::new(),
    );
    let run = WorkflowRun::new(
        event.run_id.clone(),
        event.workflow_id.clone(),
        event.project_id.clone(),
        event.user_id.clone(),
    );
    controller.store().insert_run(run, event.nodes.len()).await;

    let (outcome, error) = match controller.execute(event).await {
        Ok(outcome) => {
            info!(run_id = %event.run_id, "run finished");
            (Some(outcome), None)
        }
        Err(e) => {
            warn!(run_id = %event.run_id, error = %e, "run failed");
            (None, Some(e.to_string()))
        }
    };

    let run = controller
        .store()
        .run(&event.run_id)
        .await
        .ok_or_else(|| RunnerError::Output {
            details: format!("run {} disappeared from the store", event.run_id),
        })?;
    let steps = controller.store().steps(&event.run_id).await;
    Ok(RunReport {
        run,
        steps,
        outcome,
        error,
    })
}
