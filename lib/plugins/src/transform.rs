//! In-process image transforms: `image-resize` and `format-conversion`.

use crate::imaging;
use crate::io::{BlobStore, MediaFetcher, UploadOptions};
use async_trait::async_trait;
use image::GenericImageView;
use mediaflow_workflow::config::{ConfigSchema, ImageFormat, PluginConfig};
use mediaflow_workflow::media::{normalize_format, replace_extension};
use mediaflow_workflow::{MediaFile, MediaType, Plugin, PluginContext, PluginError, PluginOutput};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument};

const IMAGES: &[MediaType] = &[MediaType::Image];
const RESIZE_PREFIX: &str = "studio/workflows/image-resize";
const CONVERSION_PREFIX: &str = "studio/workflows/format-conversion";
const WHITE: [u8; 3] = [255, 255, 255];

/// Picks the format `original` resolves to and the name it is recorded
/// under. A writable declared format keeps its own spelling (`jpg` stays
/// `jpg`); otherwise the sniffed format is used, else png.
fn original_format(file: &MediaFile, sniffed: Option<ImageFormat>) -> (ImageFormat, String) {
    let declared = normalize_format(&file.format);
    match ImageFormat::from_name(&declared) {
        Some(format) => (format, declared),
        None => {
            let format = sniffed.unwrap_or(ImageFormat::Png);
            (format, format.as_str().to_string())
        }
    }
}

/// The fetch-decode and encode-store halves shared by both transforms.
struct Pipeline<'a> {
    fetcher: &'a dyn MediaFetcher,
    blobs: &'a dyn BlobStore,
}

impl Pipeline<'_> {
    async fn load(&self, file: &MediaFile) -> Result<imaging::Decoded, PluginError> {
        let bytes = self.fetcher.fetch(&file.url).await?;
        imaging::decode(&bytes).map_err(|e| PluginError::Input {
            file_id: file.id.clone(),
            reason: e.to_string(),
        })
    }

    async fn store(
        &self,
        mut derived: MediaFile,
        image: &image::DynamicImage,
        format: ImageFormat,
        format_name: &str,
        quality: u8,
        background: [u8; 3],
        prefix: &str,
    ) -> Result<MediaFile, PluginError> {
        let encoded = imaging::encode(image, format, quality, background)?;
        let size = encoded.len() as u64;
        let options = UploadOptions {
            content_type: format.content_type().to_string(),
            prefix: prefix.to_string(),
            extension: format_name.to_string(),
        };
        derived.url = self.blobs.put(encoded, &options).await?;
        derived.format = format_name.to_string();
        derived.size = size;
        let (width, height) = image.dimensions();
        derived.width = Some(width);
        derived.height = Some(height);
        Ok(derived)
    }
}

/// `image-resize`.
pub struct ImageResize {
    fetcher: Arc<dyn MediaFetcher>,
    blobs: Arc<dyn BlobStore>,
}

impl ImageResize {
    #[must_use]
    pub fn new(fetcher: Arc<dyn MediaFetcher>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { fetcher, blobs }
    }
}

#[async_trait]
impl Plugin for ImageResize {
    fn id(&self) -> &str {
        "image-resize"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::ImageResize
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
        let normalized = config.to_json();
        let PluginConfig::ImageResize(config) = config else {
            return Err(PluginError::ConfigMismatch {
                plugin_id: self.id().to_string(),
            });
        };
        let pipeline = Pipeline {
            fetcher: self.fetcher.as_ref(),
            blobs: self.blobs.as_ref(),
        };

        let mut outputs = Vec::new();
        for file in inputs.iter().filter(|f| self.accepts(f)) {
            let decoded = pipeline.load(file).await?;
            let resized = imaging::resize(&decoded.image, config.width, config.height, config.fit_mode)?;
            let (format, format_name) = match config.output_format.explicit() {
                Some(format) => (format, format.as_str().to_string()),
                None => original_format(file, decoded.format),
            };
            debug!(file_id = %file.id, format = %format_name, "resized image");

            let mut derived = file.derive("resized");
            derived.name = replace_extension(&file.name, &format!("_resized.{format_name}"));
            derived.metadata = Some(file.metadata_with([
                ("processedBy", json!(self.id())),
                ("config", normalized.clone()),
            ]));
            let stored = pipeline
                .store(
                    derived,
                    &resized,
                    format,
                    &format_name,
                    config.quality,
                    WHITE,
                    RESIZE_PREFIX,
                )
                .await?;
            outputs.push(stored);
        }
        Ok(PluginOutput::files(outputs))
    }
}

/// `format-conversion`.
pub struct FormatConversion {
    fetcher: Arc<dyn MediaFetcher>,
    blobs: Arc<dyn BlobStore>,
}

impl FormatConversion {
    #[must_use]
    pub fn new(fetcher: Arc<dyn MediaFetcher>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { fetcher, blobs }
    }
}

#[async_trait]
impl Plugin for FormatConversion {
    fn id(&self) -> &str {
        "format-conversion"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::FormatConversion
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
        let normalized = config.to_json();
        let PluginConfig::FormatConversion(config) = config else {
            return Err(PluginError::ConfigMismatch {
                plugin_id: self.id().to_string(),
            });
        };
        let pipeline = Pipeline {
            fetcher: self.fetcher.as_ref(),
            blobs: self.blobs.as_ref(),
        };
        let format = config.target_format;

        let mut outputs = Vec::new();
        for file in inputs.iter().filter(|f| self.accepts(f)) {
            let decoded = pipeline.load(file).await?;
            let mut derived = file.derive(format.as_str());
            derived.name = replace_extension(&file.name, &format!(".{}", format.as_str()));
            derived.metadata = Some(file.metadata_with([
                ("processedBy", json!(self.id())),
                ("config", normalized.clone()),
            ]));
            let stored = pipeline
                .store(
                    derived,
                    &decoded.image,
                    format,
                    format.as_str(),
                    config.quality,
                    config.background_rgb(),
                    CONVERSION_PREFIX,
                )
                .await?;
            outputs.push(stored);
        }
        Ok(PluginOutput::files(outputs))
    }
}
