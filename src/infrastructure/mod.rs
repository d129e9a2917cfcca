//! Infrastructure layer with external service adapters.

/// Overlay catalog client and local copy.
pub mod catalog;
/// Application configuration.
pub mod config;
/// Export of composed images.
pub mod export;
/// Image caching, eviction and downloads.
pub mod image;

pub use catalog::{CatalogClient, OverlayStore};
pub use config::{AppConfig, CliArgs, LogLevel, StorageManager};
pub use export::ExportStore;
pub use image::{DiskImageCache, EntryPattern, EvictionPolicy, HttpAssetFetcher, PruneReport};
