//! Domain error types.

mod cache_error;
mod catalog_error;
mod compose_error;

pub use cache_error::{CacheError, CacheResult};
pub use catalog_error::CatalogError;
pub use compose_error::{ComposeError, ExportError};
