//! Editing state for one photo: base image, canvas, overlay and its placement.
//!
//! Overlay loads are tagged with a generation number. Starting a new load (or
//! clearing the overlay) bumps the generation and aborts the previous task, and a
//! completion is applied only if its generation is still current.

use std::sync::Arc;

use image::{DynamicImage, RgbaImage};
use kurbo::Size;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::dto::{CompositionSnapshot, EditorEvent, EventSender, emit};
use crate::application::services::{BlendMode, HistogramRenderer, ImageCompositor};
use crate::domain::entities::{CachedAsset, OverlayTransform, TransformEvent};
use crate::domain::errors::{CacheResult, ComposeError};
use crate::infrastructure::image::DiskImageCache;

/// Result of one overlay load.
#[derive(Debug)]
pub struct OverlayCompletion {
    generation: u64,
    url: String,
    result: CacheResult<CachedAsset>,
}

impl OverlayCompletion {
    /// Generation of the request this completes.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone)]
struct PlacedOverlay {
    image: Arc<RgbaImage>,
    transform: OverlayTransform,
}

/// Owns the state of one edit. Mutated only through `&mut self`.
pub struct EditingSession {
    cache: Arc<DiskImageCache>,
    compositor: ImageCompositor,
    histogram: HistogramRenderer,
    events: Option<EventSender>,
    base: Option<Arc<RgbaImage>>,
    canvas_size: Size,
    blend_mode: BlendMode,
    overlay: Option<PlacedOverlay>,
    generation: u64,
    in_flight: Option<JoinHandle<OverlayCompletion>>,
}

impl std::fmt::Debug for EditingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditingSession")
            .field("canvas_size", &self.canvas_size)
            .field("blend_mode", &self.blend_mode)
            .field("generation", &self.generation)
            .field("has_base", &self.base.is_some())
            .field("has_overlay", &self.overlay.is_some())
            .finish_non_exhaustive()
    }
}

impl EditingSession {
    /// Creates an empty session loading overlays through `cache`.
    #[must_use]
    pub fn new(cache: Arc<DiskImageCache>) -> Self {
        Self {
            cache,
            compositor: ImageCompositor::new(),
            histogram: HistogramRenderer::new(),
            events: None,
            base: None,
            canvas_size: Size::ZERO,
            blend_mode: BlendMode::default(),
            overlay: None,
            generation: 0,
            in_flight: None,
        }
    }

    /// Publishes session events to `sender`.
    #[must_use]
    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    /// Current overlay generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns true while an overlay load is pending.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Returns true if an overlay is placed.
    #[must_use]
    pub const fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    /// Current overlay placement.
    #[must_use]
    pub fn overlay_transform(&self) -> Option<&OverlayTransform> {
        self.overlay.as_ref().map(|o| &o.transform)
    }

    /// Current canvas size.
    #[must_use]
    pub const fn canvas_size(&self) -> Size {
        self.canvas_size
    }

    /// Replaces the base image.
    pub fn set_base_image(&mut self, image: &DynamicImage) {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        self.base = Some(Arc::new(rgba));
        debug!(width, height, "Base image updated");
        emit(
            self.events.as_ref(),
            EditorEvent::BaseImageUpdated { width, height },
        );
    }

    /// Sets the canvas size. A placed overlay without a usable frame is re-centered.
    pub fn set_canvas_size(&mut self, size: Size) {
        self.canvas_size = size;
        if let Some(overlay) = &mut self.overlay {
            if overlay.transform.size.is_zero_area() {
                overlay.transform = OverlayTransform::initial(size);
            }
        }
    }

    /// Sets the overlay blend mode.
    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    /// Feeds one gesture sample to the overlay. Returns false if no overlay is placed.
    pub fn apply_gesture(&mut self, event: TransformEvent) -> bool {
        let Some(overlay) = &mut self.overlay else {
            return false;
        };
        overlay.transform = overlay.transform.apply(event);
        true
    }

    /// Places `image` as the overlay, superseding any pending load.
    pub fn set_overlay_image(&mut self, image: &DynamicImage) {
        self.supersede();
        self.place_overlay(Arc::new(image.to_rgba8()), None);
    }

    /// Removes the overlay, superseding any pending load.
    pub fn clear_overlay(&mut self) {
        self.supersede();
        self.remove_overlay();
    }

    /// Starts loading the overlay at `url` through the cache; `None` clears it.
    ///
    /// Returns the generation of the new request.
    pub fn load_overlay(&mut self, url: Option<String>) -> u64 {
        self.supersede();
        let generation = self.generation;

        let Some(url) = url else {
            self.remove_overlay();
            return generation;
        };

        debug!(generation, url = %url, "Loading overlay");
        let cache = Arc::clone(&self.cache);
        self.in_flight = Some(tokio::spawn(async move {
            let result = cache.get_or_fetch(&url).await;
            OverlayCompletion {
                generation,
                url,
                result,
            }
        }));
        generation
    }

    /// Waits for the pending overlay load and applies it.
    ///
    /// Returns the generation that was applied, or `None` if nothing was pending or
    /// the completion was stale.
    pub async fn settle(&mut self) -> Option<u64> {
        let handle = self.in_flight.take()?;
        let generation = self.generation;
        match handle.await {
            Ok(completion) => self.apply_completion(completion).then_some(generation),
            Err(e) if e.is_cancelled() => None,
            Err(e) => {
                warn!(error = %e, "Overlay load task failed");
                self.remove_overlay();
                emit(
                    self.events.as_ref(),
                    EditorEvent::Failed {
                        message: "Overlay could not be loaded.".to_string(),
                    },
                );
                Some(generation)
            }
        }
    }

    /// Applies a finished load if its generation is current. Returns false for stale
    /// completions, which leave the session untouched.
    pub fn apply_completion(&mut self, completion: OverlayCompletion) -> bool {
        if completion.generation != self.generation {
            debug!(
                stale = completion.generation,
                current = self.generation,
                "Dropping stale overlay completion"
            );
            return false;
        }

        match completion.result {
            Ok(asset) => {
                info!(
                    generation = completion.generation,
                    key = %asset.key,
                    cache_hit = asset.is_cache_hit(),
                    "Overlay loaded"
                );
                self.place_overlay(Arc::new(asset.image.to_rgba8()), Some(completion.url));
            }
            Err(e) => {
                warn!(generation = completion.generation, error = %e, "Overlay load failed");
                self.remove_overlay();
                emit(
                    self.events.as_ref(),
                    EditorEvent::Failed {
                        message: e.to_string(),
                    },
                );
            }
        }
        true
    }

    /// Captures everything needed to compose the current state.
    #[must_use]
    pub fn snapshot(&self) -> CompositionSnapshot {
        CompositionSnapshot {
            base: self.base.clone(),
            overlay: self.overlay.as_ref().map(|o| Arc::clone(&o.image)),
            canvas_size: self.canvas_size,
            transform: self.overlay.as_ref().map(|o| o.transform),
            blend_mode: self.blend_mode,
        }
    }

    /// Composes the current state.
    ///
    /// # Errors
    /// Returns `EmptyCanvas` before a canvas size is set.
    pub fn compose_preview(&self) -> Result<RgbaImage, ComposeError> {
        self.snapshot().compose(&self.compositor)
    }

    /// Renders the histogram of the composed image, or of the base image alone when
    /// the canvas is not laid out yet.
    #[must_use]
    pub fn histogram_preview(&self, size: Size, bins: usize) -> Option<RgbaImage> {
        let source = match self.compose_preview() {
            Ok(composed) => DynamicImage::ImageRgba8(composed),
            Err(_) => DynamicImage::ImageRgba8(self.base.as_deref()?.clone()),
        };
        self.histogram.render(&source, size, bins)
    }

    fn supersede(&mut self) {
        self.generation += 1;
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }

    /// Swaps the overlay image; an existing placement is kept.
    fn place_overlay(&mut self, image: Arc<RgbaImage>, url: Option<String>) {
        match &mut self.overlay {
            Some(placed) => placed.image = image,
            None => {
                self.overlay = Some(PlacedOverlay {
                    image,
                    transform: OverlayTransform::initial(self.canvas_size),
                });
            }
        }
        emit(
            self.events.as_ref(),
            EditorEvent::OverlayApplied {
                generation: self.generation,
                url,
            },
        );
    }

    fn remove_overlay(&mut self) {
        if self.overlay.take().is_some() {
            emit(self.events.as_ref(), EditorEvent::OverlayCleared);
        }
    }
}

impl Drop for EditingSession {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}
