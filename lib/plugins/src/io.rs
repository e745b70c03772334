//! Media I/O seams.
//!
//! Plugins read their inputs through a [`MediaFetcher`] and publish derived
//! bytes through a [`BlobStore`], which hands back the URL the next node reads.

use async_trait::async_trait;
use bytes::Bytes;
use mediaflow_workflow::PluginError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;
use ulid::Ulid;

/// Reads media bytes by URL.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, PluginError>;
}

/// How to store a derived file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub content_type: String,
    /// Key prefix, e.g. `studio/workflows/image-resize`.
    pub prefix: String,
    /// File extension without the dot.
    pub extension: String,
}

/// Persists media bytes and returns a URL for them.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, bytes: Bytes, options: &UploadOptions) -> Result<String, PluginError>;
}

fn io_error(message: impl Into<String>) -> PluginError {
    PluginError::Io {
        message: message.into(),
    }
}

fn object_key(options: &UploadOptions) -> String {
    format!(
        "{}/{}.{}",
        options.prefix.trim_matches('/'),
        Ulid::new().to_string().to_lowercase(),
        options.extension
    )
}

/// Fetches `http(s)://` URLs with reqwest and `file://` URLs from disk.
#[derive(Debug, Clone)]
pub struct HttpMediaFetcher {
    client: reqwest::Client,
}

impl HttpMediaFetcher {
    /// Creates a fetcher whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Io`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, PluginError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| io_error(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, PluginError> {
        if let Some(path) = url.strip_prefix("file://") {
            debug!(path, "reading local media");
            return tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|e| io_error(format!("failed to read {path}: {e}")));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(io_error(format!("unsupported media url: {url}")));
        }

        debug!(url, "downloading media");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| io_error(format!("failed to download input: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(io_error(format!("failed to download input: {status}")));
        }
        response
            .bytes()
            .await
            .map_err(|e| io_error(format!("failed to read response body: {e}")))
    }
}

/// Writes blobs under a local directory and returns `file://` URLs.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, bytes: Bytes, options: &UploadOptions) -> Result<String, PluginError> {
        let path = self.root.join(object_key(options));
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(format!("failed to create {}: {e}", parent.display())))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| io_error(format!("failed to write {}: {e}", path.display())))?;
        debug!(path = %path.display(), size = bytes.len(), "stored blob");
        Ok(format!("file://{}", path.display()))
    }
}

/// In-process blob store with `memory://` URLs.
///
/// Also serves as the fetcher for what it stores. Clones share contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `bytes` under an explicit URL.
    pub async fn insert(&self, url: impl Into<String>, bytes: impl Into<Bytes>) {
        self.blobs.lock().await.insert(url.into(), bytes.into());
    }

    pub async fn get(&self, url: &str) -> Option<Bytes> {
        self.blobs.lock().await.get(url).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, bytes: Bytes, options: &UploadOptions) -> Result<String, PluginError> {
        let url = format!("memory://{}", object_key(options));
        self.blobs.lock().await.insert(url.clone(), bytes);
        Ok(url)
    }
}

#[async_trait]
impl MediaFetcher for MemoryBlobStore {
    async fn fetch(&self, url: &str) -> Result<Bytes, PluginError> {
        self.get(url)
            .await
            .ok_or_else(|| io_error(format!("no media stored at {url}")))
    }
}
