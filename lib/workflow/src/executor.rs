//! The per-node step executor.
//!
//! One node runs as three named steps on the durable substrate:
//! `step-{node}-start`, `step-{node}-execute` and `step-{node}-complete`.
//! Between start and execute the node is bound to its plugin and config and
//! its inputs are routed. Any error propagates unchanged; the step record is
//! left where it was so the run as a whole carries the failure.

use crate::config;
use crate::error::{EngineError, PluginResolutionError};
use crate::execution::{StepOutput, StepPatch};
use crate::graph::WorkflowGraph;
use crate::node::WorkflowNode;
use crate::plugin::{PluginContext, PluginOutput};
use crate::registry::PluginRegistry;
use crate::resolver::resolve_plugin_id;
use crate::router::{ResultsByNode, inputs_for};
use crate::store::RunStore;
use crate::trigger::TriggerEvent;
use chrono::Utc;
use mediaflow_core::{StepError, StepRunner};
use tracing::{debug, instrument};

/// Executes single nodes of a run.
pub struct StepExecutor<'a, S: StepRunner, R: RunStore> {
    registry: &'a PluginRegistry,
    store: &'a R,
    steps: &'a S,
}

impl<'a, S: StepRunner, R: RunStore> StepExecutor<'a, S, R> {
    /// Creates an executor over shared run dependencies.
    #[must_use]
    pub fn new(registry: &'a PluginRegistry, store: &'a R, steps: &'a S) -> Self {
        Self {
            registry,
            store,
            steps,
        }
    }

    /// Runs `node`, recording its outputs in `results`.
    ///
    /// `order` is the node's position in the event's node array.
    ///
    /// # Errors
    ///
    /// Returns the first error from persistence, resolution, validation or
    /// the plugin itself.
    #[instrument(skip_all, fields(run_id = %event.run_id, node_id = %node.id, order))]
    pub async fn execute(
        &self,
        event: &TriggerEvent,
        node: &WorkflowNode,
        order: usize,
        graph: &WorkflowGraph,
        results: &mut ResultsByNode,
    ) -> Result<(), EngineError> {
        let run_id = &event.run_id;

        self.steps
            .run(&format!("step-{}-start", node.id), async {
                self.store
                    .update_steps_by_order(run_id, order, StepPatch::running(Utc::now()))
                    .await
                    .map_err(EngineError::from)
            })
            .await?;

        let plugin_id = resolve_plugin_id(node)?;
        let plugin = self
            .registry
            .get(&plugin_id)
            .ok_or_else(|| PluginResolutionError::UnknownPlugin {
                node_id: node.id.clone(),
                label: node.display_name().to_string(),
                plugin_id: plugin_id.clone(),
            })?;
        let config = config::validate(plugin.as_ref(), &node.raw_config())?;
        let inputs = inputs_for(&node.id, graph, results);
        debug!(plugin_id = %plugin_id, inputs = inputs.len(), "executing node");

        let ctx = PluginContext {
            run_id: run_id.clone(),
            workflow_id: event.workflow_id.clone(),
            node_id: node.id.clone(),
            project_id: event.project_id.clone(),
            user_id: event.user_id.clone(),
        };
        let output: PluginOutput = self
            .steps
            .run(&format!("step-{}-execute", node.id), async {
                plugin
                    .run(inputs.clone(), &config, &ctx)
                    .await
                    .map_err(|e| EngineError::plugin(&node.id, &plugin_id, e))
            })
            .await?;

        results.insert(&node.id, output.output_files.clone());

        let complete_step = format!("step-{}-complete", node.id);
        let record = StepOutput {
            node_id: node.id.clone(),
            plugin_id: plugin_id.clone(),
            config: config.to_json(),
            inputs,
            outputs: output.output_files.clone(),
            metadata: output.metadata.clone().unwrap_or_default(),
            completed_at: Utc::now(),
        };
        let record = serde_json::to_value(&record).map_err(|e| StepError::Record {
            step: complete_step.clone(),
            message: e.to_string(),
        })?;
        self.steps
            .run(&complete_step, async {
                self.store
                    .update_steps_by_order(run_id, order, StepPatch::completed(Utc::now(), record))
                    .await
                    .map_err(EngineError::from)
            })
            .await?;

        debug!(outputs = output.output_files.len(), "node completed");
        Ok(())
    }
}
