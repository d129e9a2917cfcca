//! Assets served by the content-addressed cache.

use std::sync::Arc;

use bytes::Bytes;

use super::CacheKey;

/// Where a cached asset was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSource {
    /// Read from the on-disk cache.
    Disk,
    /// Downloaded from the network.
    Network,
}

/// A fetched asset with its raw bytes and decoded image.
#[derive(Debug, Clone)]
pub struct CachedAsset {
    /// Content address of the source URL.
    pub key: CacheKey,
    /// Raw encoded bytes exactly as stored.
    pub bytes: Bytes,
    /// Decoded image.
    pub image: Arc<image::DynamicImage>,
    /// Where the bytes came from.
    pub source: AssetSource,
}

impl CachedAsset {
    /// Returns true if no network access was needed.
    #[must_use]
    pub const fn is_cache_hit(&self) -> bool {
        matches!(self.source, AssetSource::Disk)
    }
}
