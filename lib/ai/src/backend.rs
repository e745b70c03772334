//! Model-provider seams.
//!
//! Provider APIs are opaque request/response calls. Images travel by
//! reference (a URL the provider can read and the result URL it wrote).

use crate::error::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A background-removal request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundRemovalRequest {
    pub image_url: String,
    /// Preferred provider: `auto`, `fal` or `gemini`.
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// A background-removal result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundRemovalResult {
    pub image_url: String,
    /// The provider that actually served the request.
    pub provider: String,
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
}

/// An upscale request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpscaleRequest {
    pub image_url: String,
    pub scale: f64,
    pub max_dimension: u32,
}

/// A reframe request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReframeRequest {
    pub image_url: String,
    pub target_width: u32,
    pub target_height: u32,
    /// `cover`, `contain` or `attention`.
    pub strategy: String,
}

/// A produced image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResult {
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// The strategy applied, when the provider reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

/// A palette-extraction request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaletteRequest {
    pub image_url: String,
    pub colors: u32,
}

/// An extracted palette, as `#RRGGBB` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub colors: Vec<String>,
}

/// Image model operations used by the built-in plugins.
#[async_trait]
pub trait ImageModelBackend: Send + Sync {
    async fn remove_background(
        &self,
        request: BackgroundRemovalRequest,
    ) -> Result<BackgroundRemovalResult, BackendError>;

    async fn upscale(&self, request: UpscaleRequest) -> Result<ImageResult, BackendError>;

    async fn reframe(&self, request: ReframeRequest) -> Result<ImageResult, BackendError>;

    async fn extract_palette(&self, request: PaletteRequest) -> Result<Palette, BackendError>;
}

/// What a generator call produced.
///
/// Models can answer with text only; `result_ref` is then `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generated {
    pub result_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Produces a candidate image from a prompt and a source image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, source_ref: &str) -> Result<Generated, BackendError>;
}

/// A verifier's judgment of a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub passed: bool,
    /// Why the candidate failed; fed into the next prompt.
    pub feedback: String,
}

impl Verdict {
    #[must_use]
    pub fn pass() -> Self {
        Self {
            passed: true,
            feedback: String::new(),
        }
    }

    #[must_use]
    pub fn fail(feedback: impl Into<String>) -> Self {
        Self {
            passed: false,
            feedback: feedback.into(),
        }
    }
}

/// Judges a candidate image.
#[async_trait]
pub trait ResultVerifier: Send + Sync {
    async fn verify(&self, result_ref: &str) -> Result<Verdict, BackendError>;
}

/// A backend for deployments without model providers.
///
/// Every call fails with [`BackendError::NotConfigured`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredBackend;

#[async_trait]
impl ImageModelBackend for UnconfiguredBackend {
    async fn remove_background(
        &self,
        _request: BackgroundRemovalRequest,
    ) -> Result<BackgroundRemovalResult, BackendError> {
        Err(BackendError::NotConfigured {
            operation: "background removal",
        })
    }

    async fn upscale(&self, _request: UpscaleRequest) -> Result<ImageResult, BackendError> {
        Err(BackendError::NotConfigured {
            operation: "upscaling",
        })
    }

    async fn reframe(&self, _request: ReframeRequest) -> Result<ImageResult, BackendError> {
        Err(BackendError::NotConfigured {
            operation: "reframing",
        })
    }

    async fn extract_palette(&self, _request: PaletteRequest) -> Result<Palette, BackendError> {
        Err(BackendError::NotConfigured {
            operation: "palette extraction",
        })
    }
}

#[async_trait]
impl ImageGenerator for UnconfiguredBackend {
    async fn generate(&self, _prompt: &str, _source_ref: &str) -> Result<Generated, BackendError> {
        Err(BackendError::NotConfigured {
            operation: "image generation",
        })
    }
}

#[async_trait]
impl ResultVerifier for UnconfiguredBackend {
    async fn verify(&self, _result_ref: &str) -> Result<Verdict, BackendError> {
        Err(BackendError::NotConfigured {
            operation: "result verification",
        })
    }
}
