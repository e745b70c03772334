//! The run controller.
//!
//! Drives one [`TriggerEvent`] from claim to terminal state:
//!
//! 1. Load the run; terminal or missing runs are ignored without writes.
//! 2. `mark-running`.
//! 3. Schedule the graph and execute each node in order.
//! 4. `mark-completed` with the sink outputs, or `mark-failed` with the
//!    error message, which is then returned to the caller.
//!
//! Delivery is at least once. With a memoizing [`StepRunner`] a redelivered
//! event replays recorded steps instead of running them again. Step names are
//! scoped to the run through [`RunSteps`].

use crate::error::EngineError;
use crate::execution::RunPatch;
use crate::executor::StepExecutor;
use crate::graph::WorkflowGraph;
use crate::media::MediaFile;
use crate::node::{NodeId, WorkflowNode};
use crate::registry::PluginRegistry;
use crate::router::ResultsByNode;
use crate::scheduler;
use crate::store::RunStore;
use crate::trigger::TriggerEvent;
use chrono::Utc;
use mediaflow_core::{RunId, RunSteps, StepRunner};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue, json};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Why a trigger was acknowledged without running anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// No run record exists for the event's run id.
    RunMissing,
    /// The run already reached a terminal state.
    AlreadyFinished,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunMissing => f.write_str("run missing"),
            Self::AlreadyFinished => f.write_str("already finished"),
        }
    }
}

/// What handling a trigger produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RunOutcome {
    Completed {
        run_id: RunId,
        sink_node_ids: Vec<NodeId>,
        final_outputs: Vec<MediaFile>,
    },
    Ignored {
        run_id: RunId,
        reason: IgnoreReason,
    },
}

struct Summary {
    steps: usize,
    sink_node_ids: Vec<NodeId>,
    final_outputs: Vec<MediaFile>,
}

/// Executes workflow runs against a registry, a store and a step substrate.
pub struct RunController<S: StepRunner, R: RunStore> {
    registry: Arc<PluginRegistry>,
    store: R,
    steps: S,
}

impl<S: StepRunner, R: RunStore> RunController<S, R> {
    /// Creates a controller.
    #[must_use]
    pub fn new(registry: Arc<PluginRegistry>, store: R, steps: S) -> Self {
        Self {
            registry,
            store,
            steps,
        }
    }

    /// The run store.
    #[must_use]
    pub fn store(&self) -> &R {
        &self.store
    }

    /// The step substrate.
    #[must_use]
    pub fn steps(&self) -> &S {
        &self.steps
    }

    /// Handles one workflow-requested event.
    ///
    /// # Errors
    ///
    /// Returns the error that aborted the run, after the run has been marked
    /// `FAILED`. Errors loading or claiming the run are returned without
    /// marking anything.
    #[instrument(skip_all, fields(run_id = %event.run_id, workflow_id = %event.workflow_id))]
    pub async fn execute(&self, event: &TriggerEvent) -> Result<RunOutcome, EngineError> {
        let Some(run) = self.store.find_run(&event.run_id).await? else {
            debug!("no run record, ignoring trigger");
            return Ok(RunOutcome::Ignored {
                run_id: event.run_id.clone(),
                reason: IgnoreReason::RunMissing,
            });
        };
        if run.state.is_terminal() {
            debug!(state = run.state.as_str(), "run already finished, ignoring trigger");
            return Ok(RunOutcome::Ignored {
                run_id: event.run_id.clone(),
                reason: IgnoreReason::AlreadyFinished,
            });
        }

        let steps = RunSteps::new(&self.steps, &event.run_id);
        steps
            .run("mark-running", async {
                self.store
                    .update_run(&event.run_id, RunPatch::running(Utc::now()))
                    .await
                    .map_err(EngineError::from)
            })
            .await?;

        match self.run_to_completion(&steps, event, run.output.as_ref()).await {
            Ok(summary) => {
                info!(steps = summary.steps, sinks = summary.sink_node_ids.len(), "run completed");
                Ok(RunOutcome::Completed {
                    run_id: event.run_id.clone(),
                    sink_node_ids: summary.sink_node_ids,
                    final_outputs: summary.final_outputs,
                })
            }
            Err(error) => {
                warn!(error = %error, "run failed");
                let message = error.to_string();
                let marked: Result<(), EngineError> = steps
                    .run("mark-failed", async {
                        self.store
                            .update_run(&event.run_id, RunPatch::failed(Utc::now(), message))
                            .await
                            .map_err(EngineError::from)
                    })
                    .await;
                if let Err(mark_error) = marked {
                    warn!(error = %mark_error, "could not mark run as failed");
                }
                Err(error)
            }
        }
    }

    async fn run_to_completion(
        &self,
        steps: &RunSteps<'_, S>,
        event: &TriggerEvent,
        existing_output: Option<&JsonValue>,
    ) -> Result<Summary, EngineError> {
        let graph = WorkflowGraph::from_parts(&event.nodes, &event.edges)?;
        let order = scheduler::order(&graph)?;
        debug!(nodes = order.len(), edges = graph.edge_count(), "scheduled workflow");

        let positions: HashMap<&NodeId, (usize, &WorkflowNode)> = event
            .nodes
            .iter()
            .enumerate()
            .map(|(position, node)| (&node.id, (position, node)))
            .collect();

        let mut results = ResultsByNode::seeded(event.initial_input());
        let executor = StepExecutor::new(&self.registry, &self.store, steps);
        for node_id in &order {
            if let Some(&(position, node)) = positions.get(node_id) {
                executor
                    .execute(event, node, position, &graph, &mut results)
                    .await?;
            }
        }

        let sink_node_ids: Vec<NodeId> = graph.sink_node_ids().into_iter().cloned().collect();
        let final_outputs = results.concat(&sink_node_ids);
        let output = run_output(existing_output, order.len(), &sink_node_ids, &final_outputs);

        steps
            .run("mark-completed", async {
                self.store
                    .update_run(&event.run_id, RunPatch::completed(Utc::now(), output))
                    .await
                    .map_err(EngineError::from)
            })
            .await?;

        Ok(Summary {
            steps: order.len(),
            sink_node_ids,
            final_outputs,
        })
    }
}

/// Merges the completion summary over any object output already on the run.
fn run_output(
    existing: Option<&JsonValue>,
    steps: usize,
    sink_node_ids: &[NodeId],
    final_outputs: &[MediaFile],
) -> JsonValue {
    let mut output = match existing {
        Some(JsonValue::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    output.insert("status".to_string(), json!("completed"));
    output.insert("steps".to_string(), json!(steps));
    output.insert("sinkNodeIds".to_string(), json!(sink_node_ids));
    output.insert("finalOutputs".to_string(), json!(final_outputs));
    JsonValue::Object(output)
}
