//! The built-in plugin set.

use crate::io::{BlobStore, MediaFetcher};
use crate::mannequin::MannequinTransfer;
use crate::media::{MediaInput, MediaOutput};
use crate::models::{BackgroundRemoval, ImageReframe, ImageUpscale, PaletteExtraction};
use crate::python::PythonScript;
use crate::transform::{FormatConversion, ImageResize};
use mediaflow_ai::{ImageGenerator, ImageModelBackend, ResultVerifier};
use mediaflow_workflow::{PluginRegistry, RegistryError};
use std::sync::Arc;

/// The external seams the built-in plugins need.
#[derive(Clone)]
pub struct PluginDeps {
    pub fetcher: Arc<dyn MediaFetcher>,
    pub blobs: Arc<dyn BlobStore>,
    pub models: Arc<dyn ImageModelBackend>,
    pub generator: Arc<dyn ImageGenerator>,
    pub verifier: Arc<dyn ResultVerifier>,
}

/// Builds a registry holding every built-in plugin.
///
/// # Errors
///
/// Returns [`RegistryError`] if two built-ins share an id.
pub fn builtin_registry(deps: &PluginDeps) -> Result<PluginRegistry, RegistryError> {
    PluginRegistry::builder()
        .with_plugin(MediaInput)
        .with_plugin(MediaOutput)
        .with_plugin(BackgroundRemoval::new(deps.models.clone()))
        .with_plugin(ImageUpscale::new(deps.models.clone()))
        .with_plugin(ImageReframe::new(deps.models.clone()))
        .with_plugin(PaletteExtraction::new(deps.models.clone()))
        .with_plugin(ImageResize::new(deps.fetcher.clone(), deps.blobs.clone()))
        .with_plugin(FormatConversion::new(deps.fetcher.clone(), deps.blobs.clone()))
        .with_plugin(PythonScript)
        .with_plugin(MannequinTransfer::new(
            deps.generator.clone(),
            deps.verifier.clone(),
        ))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{self, tests::png};
    use crate::io::MemoryBlobStore;
    use crate::test_support::FakeModels;
    use image::GenericImageView;
    use mediaflow_ai::UnconfiguredBackend;
    use mediaflow_core::{MemoizingStepRunner, ProjectId, RunId, UserId, WorkflowId};
    use mediaflow_workflow::{
        EngineError, ExecutorKind, InMemoryRunStore, RunController, RunOutcome, RunState, StepState,
        TriggerEvent, WorkflowEdge, WorkflowNode, WorkflowRun,
    };
    use serde_json::json;

    fn deps(store: &MemoryBlobStore) -> PluginDeps {
        PluginDeps {
            fetcher: Arc::new(store.clone()),
            blobs: Arc::new(store.clone()),
            models: Arc::new(FakeModels),
            generator: Arc::new(UnconfiguredBackend),
            verifier: Arc::new(UnconfiguredBackend),
        }
    }

    fn event(nodes: Vec<WorkflowNode>, edges: &[(&str, &str)]) -> TriggerEvent {
        TriggerEvent {
            run_id: RunId::from("run_1"),
            workflow_id: WorkflowId::from("wf_1"),
            project_id: ProjectId::from("prj_1"),
            user_id: UserId::from("usr_1"),
            idempotency_key: None,
            nodes,
            edges: edges
                .iter()
                .map(|(source, target)| WorkflowEdge::new(*source, *target))
                .collect(),
            input: Some(json!({
                "files": [{
                    "id": "shirt",
                    "url": "memory://uploads/shirt.png",
                    "name": "shirt.png",
                    "type": "image",
                    "format": "png",
                    "size": 1024,
                    "width": 200,
                    "height": 100
                }]
            })),
        }
    }

    async fn controller(
        store: &MemoryBlobStore,
        event: &TriggerEvent,
    ) -> RunController<MemoizingStepRunner, InMemoryRunStore> {
        let registry = builtin_registry(&deps(store)).unwrap();
        let controller = RunController::new(
            Arc::new(registry),
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
        controller
    }

    #[test]
    fn registers_every_builtin_in_order() {
        let registry = builtin_registry(&deps(&MemoryBlobStore::new())).unwrap();
        let ids: Vec<_> = registry.descriptors().into_iter().map(|d| d.id).collect();
        assert_eq!(
            ids,
            vec![
                "media-input",
                "media-output",
                "background-removal",
                "image-upscale",
                "image-reframe",
                "palette-extraction",
                "image-resize",
                "format-conversion",
                "python-script",
                "mannequin-transfer",
            ]
        );
        assert!(registry.descriptors().iter().all(|d| d.version == "1.0.0"));
        let python = registry.get("python-script").unwrap();
        assert_eq!(python.executor(), ExecutorKind::Sandboxed);
    }

    #[tokio::test]
    async fn resize_then_convert_produces_a_png_at_the_new_width() {
        let store = MemoryBlobStore::new();
        store.insert("memory://uploads/shirt.png", png(200, 100)).await;
        let event = event(
            vec![
                WorkflowNode::new("input", "Upload")
                    .with_plugin("media-input")
                    .with_config(json!({})),
                WorkflowNode::new("resize", "Resize")
                    .with_plugin("image-resize")
                    .with_config(json!({"width": 100})),
                WorkflowNode::new("convert", "Convert")
                    .with_plugin("format-conversion")
                    .with_config(json!({"targetFormat": "png"})),
            ],
            &[("input", "resize"), ("resize", "convert")],
        );
        let controller = controller(&store, &event).await;

        let outcome = controller.execute(&event).await.unwrap();

        let RunOutcome::Completed {
            sink_node_ids,
            final_outputs,
            ..
        } = outcome
        else {
            panic!("expected a completed run");
        };
        assert_eq!(sink_node_ids.len(), 1);
        assert_eq!(sink_node_ids[0].as_str(), "convert");
        assert_eq!(final_outputs.len(), 1);
        let file = &final_outputs[0];
        assert_eq!(file.id, "shirt_resized_png");
        assert_eq!(file.format, "png");
        assert_eq!(file.width, Some(100));
        assert_eq!(file.height, Some(50));

        let stored = store.get(&file.url).await.unwrap();
        assert_eq!(imaging::decode(&stored).unwrap().image.dimensions(), (100, 50));

        let run = controller.store().run(&event.run_id).await.unwrap();
        assert_eq!(run.state, RunState::Completed);
        let steps = controller.store().steps(&event.run_id).await;
        assert!(steps.iter().all(|s| s.state == StepState::Completed));
    }

    #[tokio::test]
    async fn rejected_script_fails_the_run() {
        let store = MemoryBlobStore::new();
        let event = event(
            vec![
                WorkflowNode::new("script", "Script")
                    .with_plugin("python-script")
                    .with_config(json!({"scriptRef": "scripts/py/unknown.py"})),
            ],
            &[],
        );
        let controller = controller(&store, &event).await;

        let err = controller.execute(&event).await.unwrap_err();
        assert!(matches!(err, EngineError::PluginExecution { .. }));
        let run = controller.store().run(&event.run_id).await.unwrap();
        assert_eq!(run.state, RunState::Failed);
        assert!(
            run.error
                .unwrap()
                .message
                .contains("Python script is not allowlisted")
        );
    }
}
