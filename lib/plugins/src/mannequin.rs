//! `mannequin-transfer`: dresses a mannequin in the garment from each input
//! image through the generate-verify loop.

use crate::backend_error;
use async_trait::async_trait;
use mediaflow_ai::{
    GenerateVerifyLoop, ImageGenerator, MANNEQUIN_TRANSFER_PROMPT, RefineError, RefineOutcome,
    ResultVerifier, TracingStatusSink,
};
use mediaflow_core::{DirectStepRunner, JobId};
use mediaflow_workflow::config::{ConfigSchema, PluginConfig};
use mediaflow_workflow::media::replace_extension;
use mediaflow_workflow::{MediaFile, MediaType, Plugin, PluginContext, PluginError, PluginOutput};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

const IMAGES: &[MediaType] = &[MediaType::Image];

fn refine_error(err: RefineError) -> PluginError {
    match err {
        RefineError::Generation { source, .. } | RefineError::Verification { source, .. } => {
            backend_error(source)
        }
        other => PluginError::Backend {
            message: other.to_string(),
        },
    }
}

pub struct MannequinTransfer {
    generator: Arc<dyn ImageGenerator>,
    verifier: Arc<dyn ResultVerifier>,
}

impl MannequinTransfer {
    #[must_use]
    pub fn new(generator: Arc<dyn ImageGenerator>, verifier: Arc<dyn ResultVerifier>) -> Self {
        Self { generator, verifier }
    }
}

#[async_trait]
impl Plugin for MannequinTransfer {
    fn id(&self) -> &str {
        "mannequin-transfer"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::MannequinTransfer
    }

    fn supported_input_types(&self) -> Option<&[MediaType]> {
        Some(IMAGES)
    }

    #[instrument(skip_all, fields(node_id = %ctx.node_id))]
    async fn run(
        &self,
        inputs: Vec<MediaFile>,
        config: &PluginConfig,
        ctx: &PluginContext,
    ) -> Result<PluginOutput, PluginError> {
        let PluginConfig::MannequinTransfer(config) = config else {
            return Err(PluginError::ConfigMismatch {
                plugin_id: self.id().to_string(),
            });
        };
        let prompt = config.prompt.as_deref().unwrap_or(MANNEQUIN_TRANSFER_PROMPT);

        let mut outputs = Vec::new();
        for file in inputs.iter().filter(|f| self.accepts(f)) {
            // The plugin already runs inside a step, so the loop's steps run directly.
            let refine = GenerateVerifyLoop::new(self.generator.clone(), self.verifier.clone())
                .with_max_attempts(config.max_attempts)
                .with_status(Arc::new(TracingStatusSink), JobId::new());
            let outcome = refine
                .run(&DirectStepRunner, prompt, &file.url)
                .await
                .map_err(refine_error)?;

            match outcome {
                RefineOutcome::Success { url, attempts } => {
                    info!(file_id = %file.id, attempts, "mannequin transfer verified");
                    let mut derived = file.derive("mannequin");
                    derived.url = url;
                    derived.name = replace_extension(&file.name, "_mannequin.png");
                    derived.format = "png".to_string();
                    derived.metadata = Some(file.metadata_with([
                        ("processedBy", json!(self.id())),
                        ("attempts", json!(attempts)),
                    ]));
                    outputs.push(derived);
                }
                RefineOutcome::Failed { attempts, reason } => {
                    return Err(PluginError::Backend {
                        message: format!(
                            "mannequin transfer for {} failed verification after {attempts} attempts: {reason}",
                            file.id
                        ),
                    });
                }
            }
        }
        Ok(PluginOutput::files(outputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedVerifier, StubGenerator, context, image_file};
    use mediaflow_ai::UnconfiguredBackend;
    use mediaflow_workflow::config;

    fn plugin(verifier: ScriptedVerifier) -> MannequinTransfer {
        MannequinTransfer::new(Arc::new(StubGenerator::default()), Arc::new(verifier))
    }

    #[tokio::test]
    async fn verified_candidate_becomes_the_output() {
        let plugin = plugin(ScriptedVerifier::passing_on(2));
        let config = config::validate(&plugin, &json!({})).unwrap();

        let output = plugin
            .run(vec![image_file("dress")], &config, &context("mannequin"))
            .await
            .unwrap();

        let file = &output.output_files[0];
        assert_eq!(file.id, "dress_mannequin");
        assert_eq!(file.name, "dress_mannequin.png");
        assert_eq!(file.url, "memory://generated/2");
        assert_eq!(file.metadata.as_ref().unwrap()["attempts"], 2);
    }

    #[tokio::test]
    async fn exhausted_attempts_fail_with_the_last_feedback() {
        let plugin = plugin(ScriptedVerifier::passing_on(u32::MAX));
        let config = config::validate(&plugin, &json!({"maxAttempts": 2})).unwrap();

        let err = plugin
            .run(vec![image_file("dress")], &config, &context("mannequin"))
            .await
            .unwrap_err();

        let PluginError::Backend { message } = err else {
            panic!("expected a backend failure");
        };
        assert!(message.contains("after 2 attempts"));
        assert!(message.ends_with("attempt 2 rejected"));
    }

    #[tokio::test]
    async fn unconfigured_generator_is_reported() {
        let plugin = MannequinTransfer::new(Arc::new(UnconfiguredBackend), Arc::new(UnconfiguredBackend));
        let config = config::validate(&plugin, &json!({})).unwrap();

        let err = plugin
            .run(vec![image_file("dress")], &config, &context("mannequin"))
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::NotConfigured { .. }));
    }
}
