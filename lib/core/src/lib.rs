//! Core domain types and utilities for mediaflow.
//!
//! This crate provides the foundational types shared by the workflow engine,
//! the AI primitives and the built-in plugins: the error `Result` alias,
//! strongly-typed ids and the durable step seam.

pub mod error;
pub mod id;
pub mod step;

pub use error::Result;
pub use id::{JobId, ParseIdError, ProjectId, RunId, UserId, WorkflowId};
pub use step::{DirectStepRunner, MemoizingStepRunner, RunSteps, StepError, StepRunner};
