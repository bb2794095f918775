//! Storage API client for product images.

use std::sync::Arc;

use reqwest::Method;
use tracing::instrument;
use url::Url;

use super::types::UploadResponse;
use super::{ApiContext, HttpCore, RemoteError};

/// Client for the object storage API.
#[derive(Clone)]
pub struct StorageClient {
    core: Arc<HttpCore>,
}

impl StorageClient {
    pub(crate) const fn from_core(core: Arc<HttpCore>) -> Self {
        Self { core }
    }

    /// Bucket that holds product images.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.core.storage_bucket
    }

    /// `storage/v1/object/{prefix..}/{bucket}/{path}`, with each path segment
    /// percent-encoded.
    fn object_url(&self, prefix: &[&str], path: &str) -> Result<Url, RemoteError> {
        let mut url = self.core.endpoint("storage/v1/object")?;
        url.path_segments_mut()
            .map_err(|()| RemoteError::InvalidUrl("base URL cannot hold a path".to_string()))?
            .extend(prefix)
            .push(&self.core.storage_bucket)
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    /// Public URL of an object in the image bucket.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::InvalidUrl` if the URL cannot be built.
    pub fn public_url(&self, path: &str) -> Result<Url, RemoteError> {
        self.object_url(&["public"], path)
    }

    /// Upload (or overwrite) an object and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on transport failure or non-success status.
    #[instrument(skip(self, ctx, bytes), fields(size = bytes.len()))]
    pub async fn upload(
        &self,
        ctx: &ApiContext,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<Url, RemoteError> {
        let url = self.object_url(&[], path)?;
        let request = self
            .core
            .request(Method::PUT, url, ctx)
            .header("x-upsert", "true")
            .header("Content-Type", content_type)
            .body(bytes);
        let response: UploadResponse = self.core.send_json(request).await?;
        tracing::debug!(key = ?response.key, "Uploaded object");
        self.public_url(path)
    }

    /// Turn a stored image reference into an absolute URL.
    ///
    /// Blank references become `None`, absolute `http(s)` URLs are kept, and
    /// anything else is treated as a path inside the image bucket.
    #[must_use]
    pub fn resolve_image_url(&self, raw: Option<&str>) -> Option<String> {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Some(raw.to_string());
        }
        match self.public_url(raw) {
            Ok(url) => Some(url.into()),
            Err(e) => {
                tracing::warn!(error = %e, path = raw, "Dropping unresolvable image path");
                None
            }
        }
    }
}
