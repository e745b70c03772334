//! Shared fixtures for plugin tests.

use async_trait::async_trait;
use mediaflow_ai::{
    BackendError, BackgroundRemovalRequest, BackgroundRemovalResult, Generated, ImageGenerator,
    ImageModelBackend, ImageResult, Palette, PaletteRequest, ReframeRequest, ResultVerifier,
    UpscaleRequest, Verdict,
};
use mediaflow_core::{ProjectId, RunId, UserId, WorkflowId};
use mediaflow_workflow::{MediaFile, MediaType, NodeId, PluginContext};
use std::sync::atomic::{AtomicU32, Ordering};

pub(crate) fn context(node: &str) -> PluginContext {
    PluginContext {
        run_id: RunId::new(),
        workflow_id: WorkflowId::new(),
        node_id: NodeId::from(node),
        project_id: ProjectId::new(),
        user_id: UserId::new(),
    }
}

/// A 100x100 png upload at `memory://uploads/<id>`.
pub(crate) fn image_file(id: &str) -> MediaFile {
    MediaFile::new(id, format!("memory://uploads/{id}"), format!("{id}.png"), MediaType::Image)
        .with_format("png")
        .with_dimensions(100, 100)
}

/// Answers every model call from the request alone.
pub(crate) struct FakeModels;

#[async_trait]
impl ImageModelBackend for FakeModels {
    async fn remove_background(
        &self,
        request: BackgroundRemovalRequest,
    ) -> Result<BackgroundRemovalResult, BackendError> {
        let provider = match request.provider.as_str() {
            "auto" => "fal".to_string(),
            other => other.to_string(),
        };
        Ok(BackgroundRemovalResult {
            image_url: request.image_url.replace("uploads", "models/no-bg"),
            provider,
            verified: true,
            quality_score: Some(0.9),
        })
    }

    async fn upscale(&self, request: UpscaleRequest) -> Result<ImageResult, BackendError> {
        let edge = (100.0 * request.scale) as u32;
        Ok(ImageResult {
            image_url: request.image_url.replace("uploads", "models/upscaled"),
            width: Some(edge),
            height: Some(edge),
            strategy: None,
        })
    }

    async fn reframe(&self, request: ReframeRequest) -> Result<ImageResult, BackendError> {
        Ok(ImageResult {
            image_url: request.image_url.replace("uploads", "models/reframed"),
            width: None,
            height: None,
            strategy: None,
        })
    }

    async fn extract_palette(&self, request: PaletteRequest) -> Result<Palette, BackendError> {
        Ok(Palette {
            colors: (0..request.colors).map(|i| format!("#0000{i:02x}")).collect(),
        })
    }
}

/// Returns `memory://generated/<n>` on its n-th call.
#[derive(Default)]
pub(crate) struct StubGenerator {
    calls: AtomicU32,
}

#[async_trait]
impl ImageGenerator for StubGenerator {
    async fn generate(&self, _prompt: &str, _source_ref: &str) -> Result<Generated, BackendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Generated {
            result_ref: Some(format!("memory://generated/{call}")),
            text: None,
        })
    }
}

/// Rejects every candidate until its `pass_on`-th call.
pub(crate) struct ScriptedVerifier {
    pass_on: u32,
    calls: AtomicU32,
}

impl ScriptedVerifier {
    pub(crate) fn passing_on(pass_on: u32) -> Self {
        Self {
            pass_on,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ResultVerifier for ScriptedVerifier {
    async fn verify(&self, _result_ref: &str) -> Result<Verdict, BackendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call >= self.pass_on {
            Ok(Verdict::pass())
        } else {
            Ok(Verdict::fail(format!("attempt {call} rejected")))
        }
    }
}
