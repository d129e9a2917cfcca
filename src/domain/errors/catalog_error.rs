//! Overlay catalog error types.

use thiserror::Error;

/// Errors from fetching or persisting the overlay catalog.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum CatalogError {
    #[error("failed to fetch overlay catalog: {message}")]
    FetchFailed { message: String },

    #[error("catalog store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CatalogError {
    /// Creates fetch failure error.
    #[must_use]
    pub fn fetch_failed(message: impl Into<String>) -> Self {
        Self::FetchFailed {
            message: message.into(),
        }
    }

    /// Returns whether a cached catalog can stand in for this failure.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::FetchFailed { .. })
    }
}
