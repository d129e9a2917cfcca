//! Lenso - overlay compositing on top of a content-addressed image cache.
//!
//! This crate provides the core of a photo overlay editor with clean architecture:
//! disk caching of remote assets, bounded eviction, gesture-driven overlay
//! placement, compositing with blend modes, histogram previews and export.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing use cases, services and DTOs.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "lenso";
