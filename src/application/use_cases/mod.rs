//! Use case implementations.

mod catalog_use_case;
mod editing_session;
mod export_use_case;

pub use catalog_use_case::CatalogUseCase;
pub use editing_session::{EditingSession, OverlayCompletion};
pub use export_use_case::{ExportOutcome, ExportUseCase};
