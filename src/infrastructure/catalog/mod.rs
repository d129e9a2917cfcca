//! Overlay catalog adapters.

pub mod client;
pub mod store;

pub use client::{CATALOG_PATH, CatalogClient};
pub use store::{CATALOG_FILE_NAME, OverlayStore};
