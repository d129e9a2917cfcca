//! Domain layer with core entities, errors and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{CacheKey, CachedAsset, OverlayModel, OverlayTransform, TransformEvent};
pub use errors::{CacheError, CatalogError, ComposeError, ExportError};
pub use ports::{AssetFetchPort, CatalogPort};
