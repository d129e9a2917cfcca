//! Content-addressed cache error types.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Errors surfaced by the content-addressed cache.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum CacheError {
    #[error("failed to fetch {url}: {message}")]
    FetchFailed { url: String, message: String },

    #[error("asset from {url} is not a decodable image: {message}")]
    InvalidAssetData { url: String, message: String },

    #[error("cache io error: {message}")]
    Io { message: String },
}

impl CacheError {
    /// Creates fetch failure error.
    #[must_use]
    pub fn fetch_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FetchFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates invalid asset error.
    #[must_use]
    pub fn invalid_asset(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAssetData {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates io error.
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Returns whether error is network related.
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::FetchFailed { .. })
    }
}
