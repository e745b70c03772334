//! Built-in media plugins for mediaflow.
//!
//! - **Ingest/output**: `media-input`, `media-output`
//! - **Model-backed**: background removal, upscaling, reframing, palettes
//! - **In-process transforms**: `image-resize`, `format-conversion`
//! - **Script and refinement**: `python-script`, `mannequin-transfer`
//!
//! [`builtin_registry`] assembles all of them from a [`PluginDeps`] bundle.

pub mod imaging;
pub mod io;
pub mod mannequin;
pub mod media;
pub mod models;
pub mod python;
pub mod registry;
pub mod transform;

#[cfg(test)]
mod test_support;

pub use io::{BlobStore, HttpMediaFetcher, LocalBlobStore, MediaFetcher, MemoryBlobStore, UploadOptions};
pub use mannequin::MannequinTransfer;
pub use media::{MediaInput, MediaOutput};
pub use models::{BackgroundRemoval, ImageReframe, ImageUpscale, PaletteExtraction};
pub use python::{ALLOWED_SCRIPTS, PythonScript};
pub use registry::{PluginDeps, builtin_registry};
pub use transform::{FormatConversion, ImageResize};

use mediaflow_ai::BackendError;
use mediaflow_workflow::PluginError;

/// Maps a provider failure onto the plugin error taxonomy.
pub(crate) fn backend_error(err: BackendError) -> PluginError {
    match err {
        BackendError::NotConfigured { .. } => PluginError::NotConfigured {
            message: err.to_string(),
        },
        BackendError::Request { .. } | BackendError::InvalidResponse { .. } => PluginError::Backend {
            message: err.to_string(),
        },
    }
}
