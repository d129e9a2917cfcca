//! Application layer with use cases, services and DTOs.

/// Data transfer objects.
pub mod dto;
/// Image services.
pub mod services;
/// Use case implementations.
pub mod use_cases;

pub use dto::{CatalogOrigin, CatalogSnapshot, CompositionSnapshot, EditorEvent};
pub use services::{BlendMode, HistogramRenderer, ImageCompositor};
pub use use_cases::{CatalogUseCase, EditingSession, ExportOutcome, ExportUseCase};
