//! Image asset infrastructure.
//!
//! This module provides:
//! - Content-addressed disk caching of remote assets
//! - Age/size bounded eviction of cache directories
//! - The HTTP asset downloader

pub mod disk_cache;
pub mod eviction;
pub mod http_fetcher;

pub use disk_cache::{DiskImageCache, IMAGE_CACHE_DIR_NAME};
pub use eviction::{EntryPattern, EvictionPolicy, PruneReport};
pub use http_fetcher::HttpAssetFetcher;
