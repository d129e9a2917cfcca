//! Port for the remote overlay catalog.

use async_trait::async_trait;

use crate::domain::entities::OverlayModel;
use crate::domain::errors::CatalogError;

/// Source of the remote overlay list.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogPort: Send + Sync {
    /// Fetches the full overlay list.
    async fn fetch_overlays(&self) -> Result<Vec<OverlayModel>, CatalogError>;
}
