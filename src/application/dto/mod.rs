//! Data transfer objects for the application layer.

mod editor_event;
mod snapshot;

pub use editor_event::{EditorEvent, EventSender, emit};
pub use snapshot::{CatalogOrigin, CatalogSnapshot, CompositionSnapshot};
