//! `python-script`: runs an allowlisted script in a sandboxed executor.
//!
//! No sandbox is wired into this build, so allowlisted scripts fail with
//! [`PluginError::NotConfigured`] and every other script is rejected.

use async_trait::async_trait;
use mediaflow_workflow::config::{ConfigSchema, PluginConfig};
use mediaflow_workflow::{
    ExecutorKind, MediaFile, Plugin, PluginContext, PluginError, PluginOutput,
};
use tracing::warn;

const SCRIPT_DIR: &str = "scripts/py/";

/// Scripts the sandbox is allowed to run, by file name.
pub const ALLOWED_SCRIPTS: &[&str] = &[
    "accessory_detector.py",
    "ai_prompt_generator.py",
    "clean_processor.py",
    "csv_prompt_generator.py",
    "detection_data_loader.py",
    "image_correction_implementer.py",
    "new_designs_processor.py",
    "product_processor.py",
    "reference_style_transfer.py",
    "targeted_image_corrector.py",
    "trouser_adder.py",
    "veo3_video_generator.py",
    "watermark_remover.py",
];

/// Returns true if `script_ref`, with or without the `scripts/py/` prefix,
/// names an allowlisted script.
#[must_use]
pub fn is_allowed(script_ref: &str) -> bool {
    let name = script_ref.strip_prefix(SCRIPT_DIR).unwrap_or(script_ref);
    ALLOWED_SCRIPTS.contains(&name)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PythonScript;

#[async_trait]
impl Plugin for PythonScript {
    fn id(&self) -> &str {
        "python-script"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn executor(&self) -> ExecutorKind {
        ExecutorKind::Sandboxed
    }

    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::PythonScript
    }

    async fn run(
        &self,
        _inputs: Vec<MediaFile>,
        config: &PluginConfig,
        ctx: &PluginContext,
    ) -> Result<PluginOutput, PluginError> {
        let PluginConfig::PythonScript(config) = config else {
            return Err(PluginError::ConfigMismatch {
                plugin_id: self.id().to_string(),
            });
        };

        if !is_allowed(&config.script_ref) {
            warn!(node_id = %ctx.node_id, script = %config.script_ref, "script not allowlisted");
            return Err(PluginError::Rejected {
                reason: format!(
                    "Python script is not allowlisted: {}. Allowed scripts: {}",
                    config.script_ref,
                    ALLOWED_SCRIPTS.join(", ")
                ),
            });
        }

        Err(PluginError::NotConfigured {
            message: format!(
                "python execution is not configured; cannot run {}",
                config.script_ref
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;
    use mediaflow_workflow::config;
    use serde_json::json;

    #[test]
    fn allowlist_accepts_prefixed_and_bare_names() {
        assert!(is_allowed("scripts/py/clean_processor.py"));
        assert!(is_allowed("watermark_remover.py"));
        assert!(!is_allowed("scripts/py/../../etc/passwd"));
        assert!(!is_allowed("scripts/other/clean_processor.py"));
        assert!(!is_allowed("rm_rf.py"));
    }

    #[tokio::test]
    async fn unknown_script_is_rejected() {
        let config = config::validate(&PythonScript, &json!({"scriptRef": "scripts/py/evil.py"})).unwrap();
        let err = PythonScript.run(vec![], &config, &context("py")).await.unwrap_err();
        assert!(matches!(
            err,
            PluginError::Rejected { ref reason }
                if reason.starts_with("Python script is not allowlisted: scripts/py/evil.py")
        ));
    }

    #[tokio::test]
    async fn allowlisted_script_needs_an_executor() {
        let config =
            config::validate(&PythonScript, &json!({"scriptRef": "scripts/py/product_processor.py"})).unwrap();
        let err = PythonScript.run(vec![], &config, &context("py")).await.unwrap_err();
        assert!(matches!(err, PluginError::NotConfigured { .. }));
    }

    #[test]
    fn describes_itself_as_sandboxed() {
        assert_eq!(PythonScript.descriptor().executor, ExecutorKind::Sandboxed);
    }
}
