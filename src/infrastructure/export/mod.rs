//! Export of composed images.

pub mod store;

pub use store::{DEFAULT_EXPORT_PREFIX, EXPORT_DIR_NAME, EncodedExport, ExportStore, JPEG_QUALITY};
