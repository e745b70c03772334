//! Error types for the AI crate.
//!
//! - `BackendError`: a model provider call failed
//! - `StatusError`: a job status update could not be written
//! - `RefineError`: the generate-verify loop aborted

use mediaflow_core::{JobId, StepError};
use std::fmt;

/// Errors from model-provider calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// No provider is configured for the operation.
    NotConfigured { operation: &'static str },
    /// The provider call failed.
    Request { message: String },
    /// The provider answered with something unusable.
    InvalidResponse { message: String },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured { operation } => {
                write!(f, "no model provider configured for {operation}")
            }
            Self::Request { message } => write!(f, "model request failed: {message}"),
            Self::InvalidResponse { message } => {
                write!(f, "invalid model response: {message}")
            }
        }
    }
}

impl std::error::Error for BackendError {}

/// A job status update failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusError {
    pub job_id: JobId,
    pub message: String,
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to update job {}: {}", self.job_id, self.message)
    }
}

impl std::error::Error for StatusError {}

/// Errors that abort the generate-verify loop.
///
/// A failing verdict is not an error; it is retried until the attempt budget
/// runs out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefineError {
    /// The generator call failed.
    Generation { attempt: u32, source: BackendError },
    /// The generator answered without a result.
    EmptyResult { attempt: u32 },
    /// The verifier call failed.
    Verification { attempt: u32, source: BackendError },
    /// Reporting job status failed.
    Status(StatusError),
    /// The step substrate failed.
    Step(StepError),
}

impl fmt::Display for RefineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generation { attempt, source } => {
                write!(f, "generation failed on attempt {attempt}: {source}")
            }
            Self::EmptyResult { attempt } => {
                write!(f, "generator returned no image on attempt {attempt}")
            }
            Self::Verification { attempt, source } => {
                write!(f, "verification failed on attempt {attempt}: {source}")
            }
            Self::Status(e) => e.fmt(f),
            Self::Step(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for RefineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Generation { source, .. } | Self::Verification { source, .. } => Some(source),
            Self::Status(e) => Some(e),
            Self::Step(e) => Some(e),
            Self::EmptyResult { .. } => None,
        }
    }
}

impl From<StatusError> for RefineError {
    fn from(e: StatusError) -> Self {
        Self::Status(e)
    }
}

impl From<StepError> for RefineError {
    fn from(e: StepError) -> Self {
        Self::Step(e)
    }
}
