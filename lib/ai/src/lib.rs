//! Model-provider seams and bounded refinement for mediaflow.
//!
//! - **Backends**: opaque image-model operations used by the built-in plugins
//! - **Generate-Verify Loop**: feedback-conditioned retries until a verifier
//!   accepts a candidate or the attempt budget runs out
//!
//! Concrete provider clients live outside this crate; everything here talks
//! to them through the traits in [`backend`].

pub mod backend;
pub mod error;
pub mod prompt;
pub mod refine;

pub use backend::{
    BackgroundRemovalRequest, BackgroundRemovalResult, Generated, ImageGenerator,
    ImageModelBackend, ImageResult, Palette, PaletteRequest, ReframeRequest, ResultVerifier,
    UnconfiguredBackend, UpscaleRequest, Verdict,
};
pub use error::{BackendError, RefineError, StatusError};
pub use prompt::{MANNEQUIN_TRANSFER_PROMPT, prompt_for_attempt};
pub use refine::{
    GenerateVerifyLoop, JobStatus, JobStatusSink, RefineConfig, RefineOutcome, TracingStatusSink,
};
