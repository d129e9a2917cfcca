//! Port for fetching raw asset bytes by URL.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::errors::CacheResult;

/// Fetches raw bytes for a URL. Implementations must not retry on their own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetFetchPort: Send + Sync {
    /// Downloads the body at `url`.
    async fn fetch(&self, url: &str) -> CacheResult<Bytes>;
}
