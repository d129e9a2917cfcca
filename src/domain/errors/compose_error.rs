//! Compositing and export error types.

use thiserror::Error;

/// Errors from the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ComposeError {
    /// The target canvas has no pixels, usually because layout has not happened yet.
    #[error("canvas size {width}x{height} is empty")]
    EmptyCanvas {
        /// Requested width.
        width: f64,
        /// Requested height.
        height: f64,
    },

    /// The canvas or a source image exceeds the raster limits.
    #[error("{width}x{height} exceeds the raster size limit")]
    TooLarge {
        /// Offending width.
        width: f64,
        /// Offending height.
        height: f64,
    },
}

impl ComposeError {
    /// Creates a size limit error for an image of `width` by `height` pixels.
    #[must_use]
    pub fn too_large(width: u32, height: u32) -> Self {
        Self::TooLarge {
            width: f64::from(width),
            height: f64::from(height),
        }
    }

    /// Returns whether the error reflects a transient layout state.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::EmptyCanvas { .. })
    }
}

/// Errors from exporting a composed image.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ExportError {
    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("image could not be encoded as jpeg ({jpeg}) or png ({png})")]
    EncodeFailed { jpeg: String, png: String },

    #[error("export io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("export task failed: {message}")]
    Task { message: String },
}

impl ExportError {
    /// Creates encode failure error.
    #[must_use]
    pub fn encode_failed(jpeg: impl Into<String>, png: impl Into<String>) -> Self {
        Self::EncodeFailed {
            jpeg: jpeg.into(),
            png: png.into(),
        }
    }

    /// Returns a message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Compose(ComposeError::EmptyCanvas { .. }) => "Nothing to export yet.".to_string(),
            Self::Compose(ComposeError::TooLarge { .. }) => {
                "The image is too large to export.".to_string()
            }
            Self::EncodeFailed { .. } => "The image could not be encoded.".to_string(),
            Self::Io(e) => format!("The image could not be saved: {e}"),
            Self::Task { .. } => "The export was interrupted.".to_string(),
        }
    }
}
