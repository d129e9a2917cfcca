//! HTTP implementation of the asset fetch port.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::AssetFetchPort;

/// Plain `GET` downloader backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    http_client: reqwest::Client,
}

impl HttpAssetFetcher {
    /// Creates a fetcher with the given request timeout.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(timeout: Duration) -> CacheResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::io(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { http_client })
    }

    /// Wraps an existing client.
    #[must_use]
    pub const fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl AssetFetchPort for HttpAssetFetcher {
    async fn fetch(&self, url: &str) -> CacheResult<Bytes> {
        let response = self.http_client.get(url).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Asset request failed");
            if e.is_timeout() {
                CacheError::fetch_failed(url, "request timed out")
            } else {
                CacheError::fetch_failed(url, format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CacheError::fetch_failed(
                url,
                format!(
                    "HTTP {}: {}",
                    status,
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CacheError::fetch_failed(url, format!("Failed to read body: {e}")))?;

        debug!(url = %url, size = bytes.len(), "Downloaded asset");
        Ok(bytes)
    }
}
