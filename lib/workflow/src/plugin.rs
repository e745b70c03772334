//! The plugin contract.
//!
//! A plugin is a versioned unit of node behavior. It declares which config
//! schema it is validated against and receives the matching [`PluginConfig`]
//! variant at run time.

use crate::config::{ConfigSchema, PluginConfig};
use crate::media::{MediaFile, MediaType};
use crate::node::NodeId;
use async_trait::async_trait;
use mediaflow_core::{ProjectId, RunId, UserId, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// Where a plugin's work executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorKind {
    /// In-process.
    #[default]
    Native,
    /// In an isolated sandbox (e.g. a hosted Python runtime).
    Sandboxed,
}

/// Identifies the run and node a plugin invocation belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginContext {
    pub run_id: RunId,
    pub workflow_id: WorkflowId,
    pub node_id: NodeId,
    pub project_id: ProjectId,
    pub user_id: UserId,
}

/// What a plugin produced.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginOutput {
    pub output_files: Vec<MediaFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, JsonValue>>,
}

impl PluginOutput {
    /// Creates an output with files and no metadata.
    #[must_use]
    pub fn files(output_files: Vec<MediaFile>) -> Self {
        Self {
            output_files,
            metadata: None,
        }
    }

    /// Attaches metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, JsonValue>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A plugin's public description, as listed by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescriptor {
    pub id: String,
    pub version: String,
    pub executor: ExecutorKind,
    pub config_schema: ConfigSchema,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_input_types: Option<Vec<MediaType>>,
}

/// A pluggable unit of node behavior.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Stable plugin id, e.g. `image-resize`.
    fn id(&self) -> &str;

    /// Semantic version of the implementation.
    fn version(&self) -> &str;

    /// Where the plugin runs.
    fn executor(&self) -> ExecutorKind {
        ExecutorKind::Native
    }

    /// The schema node configs are validated against.
    fn config_schema(&self) -> ConfigSchema;

    /// Media types the plugin processes; `None` accepts everything.
    fn supported_input_types(&self) -> Option<&[MediaType]> {
        None
    }

    /// Returns true if the plugin processes `file`.
    fn accepts(&self, file: &MediaFile) -> bool {
        self.supported_input_types()
            .is_none_or(|types| types.contains(&file.media_type))
    }

    /// Describes the plugin.
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            id: self.id().to_string(),
            version: self.version().to_string(),
            executor: self.executor(),
            config_schema: self.config_schema(),
            supported_input_types: self.supported_input_types().map(<[MediaType]>::to_vec),
        }
    }

    /// Runs the plugin over its routed input files.
    async fn run(
        &self,
        inputs: Vec<MediaFile>,
        config: &PluginConfig,
        ctx: &PluginContext,
    ) -> Result<PluginOutput, PluginError>;
}

/// Errors raised by plugin execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    /// The plugin received a config variant for another schema.
    ConfigMismatch { plugin_id: String },
    /// An input file cannot be processed.
    Input { file_id: String, reason: String },
    /// Fetching or storing media failed.
    Io { message: String },
    /// Decoding or encoding media failed.
    Codec { message: String },
    /// An external model provider failed.
    Backend { message: String },
    /// The requested operation is not permitted in this deployment.
    Rejected { reason: String },
    /// A required executor or provider is not configured.
    NotConfigured { message: String },
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigMismatch { plugin_id } => {
                write!(f, "received a config for a different plugin than '{plugin_id}'")
            }
            Self::Input { file_id, reason } => write!(f, "input {file_id}: {reason}"),
            Self::Io { message } => write!(f, "media i/o failed: {message}"),
            Self::Codec { message } => write!(f, "codec error: {message}"),
            Self::Backend { message } => write!(f, "model backend failed: {message}"),
            Self::Rejected { reason } => write!(f, "rejected: {reason}"),
            Self::NotConfigured { message } => write!(f, "not configured: {message}"),
        }
    }
}

impl std::error::Error for PluginError {}
