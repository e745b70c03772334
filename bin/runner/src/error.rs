//! Domain error types for runner operations.
//!
//! Callers wrap these in a rootcause `Report` at the binary's outer layer.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum RunnerError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// The trigger file could not be read.
    ReadTrigger { path: PathBuf, details: String },
    /// The trigger file is not a valid trigger event.
    ParseTrigger { path: PathBuf, details: String },
    /// The plugin set or its I/O could not be set up.
    Setup { details: String },
    /// Results could not be written out.
    Output { details: String },
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "invalid configuration: {details}"),
            Self::ReadTrigger { path, details } => {
                write!(f, "failed to read trigger {}: {details}", path.display())
            }
            Self::ParseTrigger { path, details } => {
                write!(f, "invalid trigger {}: {details}", path.display())
            }
            Self::Setup { details } => write!(f, "failed to set up plugins: {details}"),
            Self::Output { details } => write!(f, "failed to write output: {details}"),
        }
    }
}

impl std::error::Error for RunnerError {}
