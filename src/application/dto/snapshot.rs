//! Owned snapshots handed across task boundaries.

use std::sync::Arc;

use image::RgbaImage;
use kurbo::Size;

use crate::application::services::{BlendMode, ImageCompositor};
use crate::domain::entities::{OverlayModel, OverlayTransform};
use crate::domain::errors::ComposeError;

/// Everything needed to compose the current edit, detached from the session.
#[derive(Debug, Clone)]
pub struct CompositionSnapshot {
    /// Base image, if one is set.
    pub base: Option<Arc<RgbaImage>>,
    /// Overlay image, if one is placed.
    pub overlay: Option<Arc<RgbaImage>>,
    /// Target canvas size.
    pub canvas_size: Size,
    /// Overlay placement.
    pub transform: Option<OverlayTransform>,
    /// Overlay blend mode.
    pub blend_mode: BlendMode,
}

impl CompositionSnapshot {
    /// Composes the snapshot into a new image.
    ///
    /// # Errors
    /// Returns `EmptyCanvas` if the canvas has no pixels and `TooLarge` past the
    /// raster limits.
    pub fn compose(&self, compositor: &ImageCompositor) -> Result<RgbaImage, ComposeError> {
        compositor.compose(
            self.base.as_deref(),
            self.overlay.as_deref(),
            self.canvas_size,
            self.transform.as_ref(),
            self.blend_mode,
        )
    }
}

/// Where a catalog list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogOrigin {
    /// Fetched from the remote endpoint.
    Network,
    /// Read from the local copy.
    Cache,
}

impl std::fmt::Display for CatalogOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Cache => write!(f, "cache"),
        }
    }
}

/// Result of a catalog refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSnapshot {
    /// Overlay list.
    pub overlays: Vec<OverlayModel>,
    /// Where the list came from.
    pub origin: CatalogOrigin,
}
