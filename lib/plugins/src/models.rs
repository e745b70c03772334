//! Plugins backed by an [`ImageModelBackend`].
//!
//! Each one hands image URLs to the backend and records what the provider
//! returned. Non-image inputs are skipped.

use crate::backend_error;
use async_trait::async_trait;
use mediaflow_ai::{
    BackgroundRemovalRequest, ImageModelBackend, PaletteRequest, ReframeRequest, UpscaleRequest,
};
use mediaflow_workflow::config::{ConfigSchema, PluginConfig};
use mediaflow_workflow::media::replace_extension;
use mediaflow_workflow::{MediaFile, MediaType, Plugin, PluginContext, PluginError, PluginOutput};
use serde_json::{Map, json};
use std::sync::Arc;
use tracing::debug;

const IMAGES: &[MediaType] = &[MediaType::Image];

fn mismatch(plugin: &dyn Plugin) -> PluginError {
    PluginError::ConfigMismatch {
        plugin_id: plugin.id().to_string(),
    }
}

/// `background-removal`.
pub struct BackgroundRemoval {
    models: Arc<dyn ImageModelBackend>,
}

impl BackgroundRemoval {
    #[must_use]
    pub fn new(models: Arc<dyn ImageModelBackend>) -> Self {
        Self { models }
    }
}

#[async_trait]
impl Plugin for BackgroundRemoval {
    fn id(&self) -> &str {
        "background-removal"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::BackgroundRemoval
    }

    fn supported_input_types(&self) -> Option<&[MediaType]> {
        Some(IMAGES)
    }

    async fn run(
        &self,
        inputs: Vec<MediaFile>,
        config: &PluginConfig,
        _ctx: &PluginContext,
    ) -> Result<PluginOutput, PluginError> {
        let PluginConfig::BackgroundRemoval(config) = config else {
            return Err(mismatch(self));
        };

        let mut outputs = Vec::new();
        for file in inputs.iter().filter(|f| self.accepts(f)) {
            debug!(file_id = %file.id, provider = config.provider.as_str(), "removing background");
            let result = self
                .models
                .remove_background(BackgroundRemovalRequest {
                    image_url: file.url.clone(),
                    provider: config.provider.as_str().to_string(),
                    api_key: config.api_key.clone(),
                })
                .await
                .map_err(backend_error)?;

            let mut derived = file.derive("no_bg");
            derived.url = result.image_url;
            derived.name = replace_extension(&file.name, "_no_bg.png");
            derived.format = "png".to_string();
            derived.metadata = Some(file.metadata_with([
                ("processedBy", json!(self.id())),
                ("provider", json!(result.provider)),
                ("verified", json!(result.verified)),
                ("qualityScore", json!(result.quality_score)),
            ]));
            outputs.push(derived);
        }
        Ok(PluginOutput::files(outputs))
    }
}

/// `image-upscale`.
pub struct ImageUpscale {
    models: Arc<dyn ImageModelBackend>,
}

impl ImageUpscale {
    #[must_use]
    pub fn new(models: Arc<dyn ImageModelBackend>) -> Self {
        Self { models }
    }
}

#[async_trait]
impl Plugin for ImageUpscale {
    fn id(&self) -> &str {
        "image-upscale"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::ImageUpscale
    }

    fn supported_input_types(&self) -> Option<&[MediaType]> {
        Some(IMAGES)
    }

    async fn run(
        &self,
        inputs: Vec<MediaFile>,
        config: &PluginConfig,
        _ctx: &PluginContext,
    ) -> Result<PluginOutput, PluginError> {
        let normalized = config.to_json();
        let PluginConfig::ImageUpscale(config) = config else {
            return Err(mismatch(self));
        };

        let mut outputs = Vec::new();
        for file in inputs.iter().filter(|f| self.accepts(f)) {
            let result = self
                .models
                .upscale(UpscaleRequest {
                    image_url: file.url.clone(),
                    scale: config.scale,
                    max_dimension: config.max_dimension,
                })
                .await
                .map_err(backend_error)?;

            let mut derived = file.derive("upscaled");
            derived.url = result.image_url;
            derived.name = replace_extension(&file.name, "_upscaled.png");
            derived.format = "png".to_string();
            derived.width = result.width.or(file.width);
            derived.height = result.height.or(file.height);
            derived.metadata = Some(file.metadata_with([
                ("processedBy", json!(self.id())),
                ("config", normalized.clone()),
            ]));
            outputs.push(derived);
        }
        Ok(PluginOutput::files(outputs))
    }
}

/// `image-reframe`.
pub struct ImageReframe {
    models: Arc<dyn ImageModelBackend>,
}

impl ImageReframe {
    #[must_use]
    pub fn new(models: Arc<dyn ImageModelBackend>) -> Self {
        Self { models }
    }
}

#[async_trait]
impl Plugin for ImageReframe {
    fn id(&self) -> &str {
        "image-reframe"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::ImageReframe
    }

    fn supported_input_types(&self) -> Option<&[MediaType]> {
        Some(IMAGES)
    }

    async fn run(
        &self,
        inputs: Vec<MediaFile>,
        config: &PluginConfig,
        _ctx: &PluginContext,
    ) -> Result<PluginOutput, PluginError> {
        let normalized = config.to_json();
        let PluginConfig::ImageReframe(config) = config else {
            return Err(mismatch(self));
        };

        let mut outputs = Vec::new();
        for file in inputs.iter().filter(|f| self.accepts(f)) {
            let result = self
                .models
                .reframe(ReframeRequest {
                    image_url: file.url.clone(),
                    target_width: config.target_width,
                    target_height: config.target_height,
                    strategy: config.strategy.as_str().to_string(),
                })
                .await
                .map_err(backend_error)?;

            let strategy = result
                .strategy
                .unwrap_or_else(|| config.strategy.as_str().to_string());
            let mut derived = file.derive("reframed");
            derived.url = result.image_url;
            derived.name = replace_extension(&file.name, "_reframed.png");
            derived.format = "png".to_string();
            derived.width = result.width.or(Some(config.target_width));
            derived.height = result.height.or(Some(config.target_height));
            derived.metadata = Some(file.metadata_with([
                ("processedBy", json!(self.id())),
                ("config", normalized.clone()),
                ("strategy", json!(strategy)),
            ]));
            outputs.push(derived);
        }
        Ok(PluginOutput::files(outputs))
    }
}

/// `palette-extraction`: annotates the run with per-image palettes and
/// passes its inputs through.
pub struct PaletteExtraction {
    models: Arc<dyn ImageModelBackend>,
}

impl PaletteExtraction {
    #[must_use]
    pub fn new(models: Arc<dyn ImageModelBackend>) -> Self {
        Self { models }
    }
}

#[async_trait]
impl Plugin for PaletteExtraction {
    fn id(&self) -> &str {
        "palette-extraction"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::PaletteExtraction
    }

    fn supported_input_types(&self) -> Option<&[MediaType]> {
        Some(IMAGES)
    }

    async fn run(
        &self,
        inputs: Vec<MediaFile>,
        config: &PluginConfig,
        _ctx: &PluginContext,
    ) -> Result<PluginOutput, PluginError> {
        let normalized = config.to_json();
        let PluginConfig::PaletteExtraction(config) = config else {
            return Err(mismatch(self));
        };

        let mut palettes = Vec::new();
        for file in inputs.iter().filter(|f| self.accepts(f)) {
            let palette = self
                .models
                .extract_palette(PaletteRequest {
                    image_url: file.url.clone(),
                    colors: config.colors,
                })
                .await
                .map_err(backend_error)?;
            palettes.push(json!({ "fileId": file.id, "palette": palette.colors }));
        }

        let mut metadata = Map::new();
        metadata.insert("palettes".to_string(), json!(palettes));
        metadata.insert("config".to_string(), normalized);
        Ok(PluginOutput::files(inputs).with_metadata(metadata))
    }
}
