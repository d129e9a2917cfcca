//! Pure image services shared by use cases and the CLI.

pub mod compositor;
pub mod histogram;
pub(crate) mod raster;

pub use compositor::{ImageCompositor, MAX_CANVAS_PIXELS};
pub use histogram::{DEFAULT_BINS, HistogramRenderer};
pub use raster::BlendMode;
