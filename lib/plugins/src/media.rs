//! Ingest and output plugins.

use async_trait::async_trait;
use mediaflow_workflow::config::{ConfigSchema, PluginConfig};
use mediaflow_workflow::{MediaFile, Plugin, PluginContext, PluginError, PluginOutput};
use serde_json::{Map, json};

/// `media-input`: filters the run's uploads by size and count.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaInput;

#[async_trait]
impl Plugin for MediaInput {
    fn id(&self) -> &str {
        "media-input"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::MediaInput
    }

    async fn run(
        &self,
        inputs: Vec<MediaFile>,
        config: &PluginConfig,
        _ctx: &PluginContext,
    ) -> Result<PluginOutput, PluginError> {
        let PluginConfig::MediaInput(config) = config else {
            return Err(PluginError::ConfigMismatch {
                plugin_id: self.id().to_string(),
            });
        };

        let files_in = inputs.len();
        let max_bytes = config.max_bytes();
        let accepted: Vec<MediaFile> = inputs
            .into_iter()
            .filter(|file| file.size <= max_bytes)
            .take(config.max_files as usize)
            .collect();

        let mut metadata = Map::new();
        metadata.insert("filesIn".to_string(), json!(files_in));
        metadata.insert("filesOut".to_string(), json!(accepted.len()));
        metadata.insert("maxFiles".to_string(), json!(config.max_files));
        metadata.insert("maxSizePerFileMb".to_string(), json!(config.max_size_per_file_mb));
        Ok(PluginOutput::files(accepted).with_metadata(metadata))
    }
}

/// `media-output`: marks its inputs as final outputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaOutput;

#[async_trait]
impl Plugin for MediaOutput {
    fn id(&self) -> &str {
        "media-output"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::MediaOutput
    }

    async fn run(
        &self,
        inputs: Vec<MediaFile>,
        _config: &PluginConfig,
        _ctx: &PluginContext,
    ) -> Result<PluginOutput, PluginError> {
        let mut metadata = Map::new();
        metadata.insert("kind".to_string(), json!("output"));
        Ok(PluginOutput::files(inputs).with_metadata(metadata))
    }
}
