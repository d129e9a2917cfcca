//! Flattens a base image and a transformed overlay into one buffer.

use image::RgbaImage;
use kurbo::{Affine, Size};
use tracing::trace;

use super::raster::{self, BlendMode};
use crate::domain::entities::{OverlayTransform, aspect_fit_rect, image_size};
use crate::domain::errors::ComposeError;

/// Largest canvas, in pixels, the compositor will allocate.
pub const MAX_CANVAS_PIXELS: u64 = 1 << 26;

/// Stateless compositor. Output depends only on the inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCompositor;

impl ImageCompositor {
    /// Creates a compositor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Composes `base` and `overlay` onto a transparent canvas of `canvas_size`.
    ///
    /// The base is aspect-fit into the canvas with source-over. The overlay is drawn
    /// only when a transform is present: it is aspect-fit into `transform.size` in the
    /// overlay's local frame, mapped onto the canvas by the transform, and blended
    /// with `blend_mode`.
    ///
    /// # Errors
    /// Returns `EmptyCanvas` if the canvas has no pixels and `TooLarge` if the canvas
    /// or one of the images exceeds the raster limits.
    pub fn compose(
        &self,
        base: Option<&RgbaImage>,
        overlay: Option<&RgbaImage>,
        canvas_size: Size,
        transform: Option<&OverlayTransform>,
        blend_mode: BlendMode,
    ) -> Result<RgbaImage, ComposeError> {
        let (width, height) = canvas_pixels(canvas_size)?;
        let mut canvas = vello_cpu::Pixmap::new(width, height);

        if let Some(base) = base {
            let rect = aspect_fit_rect(image_size(base.width(), base.height()), canvas_size);
            let mut ctx = vello_cpu::RenderContext::new(width, height);
            if !raster::draw_image(&mut ctx, base, rect, Affine::IDENTITY) {
                return Err(ComposeError::too_large(base.width(), base.height()));
            }
            ctx.flush();
            ctx.render_to_pixmap(&mut canvas);
        }

        if let (Some(overlay), Some(transform)) = (overlay, transform) {
            let inner = aspect_fit_rect(
                image_size(overlay.width(), overlay.height()),
                transform.size,
            );
            let mut ctx = vello_cpu::RenderContext::new(width, height);
            if !raster::draw_image(&mut ctx, overlay, inner, transform.local_to_canvas()) {
                return Err(ComposeError::too_large(overlay.width(), overlay.height()));
            }
            let mut layer = vello_cpu::Pixmap::new(width, height);
            ctx.flush();
            ctx.render_to_pixmap(&mut layer);
            raster::blend_layer(&mut canvas, &layer, blend_mode);
        }

        trace!(width, height, blend = %blend_mode, "Composed image");
        Ok(raster::pixmap_to_image(&canvas))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn canvas_pixels(size: Size) -> Result<(u16, u16), ComposeError> {
    if !(size.width.is_finite() && size.height.is_finite() && size.width > 0.0 && size.height > 0.0)
    {
        return Err(ComposeError::EmptyCanvas {
            width: size.width,
            height: size.height,
        });
    }
    let width = size.width.round();
    let height = size.height.round();
    if width < 1.0 || height < 1.0 {
        return Err(ComposeError::EmptyCanvas {
            width: size.width,
            height: size.height,
        });
    }
    let too_large = ComposeError::TooLarge {
        width: size.width,
        height: size.height,
    };
    if width > f64::from(u16::MAX) || height > f64::from(u16::MAX) {
        return Err(too_large);
    }
    let (width, height) = (width as u16, height as u16);
    if u64::from(width) * u64::from(height) > MAX_CANVAS_PIXELS {
        return Err(too_large);
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::TransformEvent;
    use image::Rgba;
    use std::f64::consts::FRAC_PI_2;
    use test_case::test_case;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    fn solid(w: u32, h: u32, px: Rgba<u8>) -> RgbaImage {
        RgbaImage::from_pixel(w, h, px)
    }

    #[test_case(Size::new(0.0, 100.0) ; "zero_width")]
    #[test_case(Size::new(100.0, -5.0) ; "negative_height")]
    #[test_case(Size::new(f64::NAN, 10.0) ; "nan")]
    #[test_case(Size::new(0.3, 10.0) ; "rounds_to_zero")]
    fn test_empty_canvas(size: Size) {
        let err = ImageCompositor::new()
            .compose(None, None, size, None, BlendMode::Screen)
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[test_case(Size::new(1e6, 1e6) ; "huge")]
    #[test_case(Size::new(70_000.0, 10.0) ; "wider_than_raster")]
    #[test_case(Size::new(9000.0, 9000.0) ; "too_many_pixels")]
    fn test_oversized_canvas_is_rejected(size: Size) {
        let err = ImageCompositor::new()
            .compose(None, None, size, None, BlendMode::Screen)
            .unwrap_err();
        assert!(matches!(err, ComposeError::TooLarge { .. }), "{err:?}");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_oversized_base_is_rejected() {
        let base = RgbaImage::new(u32::from(u16::MAX) + 1, 1);
        let err = ImageCompositor::new()
            .compose(Some(&base), None, Size::new(10.0, 10.0), None, BlendMode::Normal)
            .unwrap_err();
        assert!(matches!(err, ComposeError::TooLarge { .. }));
    }

    #[test]
    fn test_blank_canvas_is_transparent() {
        let out = ImageCompositor::new()
            .compose(None, None, Size::new(7.0, 5.0), None, BlendMode::Screen)
            .unwrap();
        assert_eq!(out.dimensions(), (7, 5));
        assert!(out.pixels().all(|p| *p == CLEAR));
    }

    #[test]
    fn test_base_is_aspect_fit_and_letterboxed() {
        let base = solid(200, 100, RED);
        let out = ImageCompositor::new()
            .compose(Some(&base), None, Size::new(100.0, 100.0), None, BlendMode::Screen)
            .unwrap();

        assert_eq!(out.dimensions(), (100, 100));
        assert_eq!(*out.get_pixel(50, 10), CLEAR);
        assert!(out.get_pixel(50, 24)[3] <= 2, "{:?}", out.get_pixel(50, 24));
        assert!(out.get_pixel(50, 25)[3] >= 253, "{:?}", out.get_pixel(50, 25));
        assert_eq!(*out.get_pixel(0, 50), RED);
        assert_eq!(*out.get_pixel(50, 50), RED);
        assert!(out.get_pixel(50, 74)[3] >= 253, "{:?}", out.get_pixel(50, 74));
        assert!(out.get_pixel(50, 75)[3] <= 2, "{:?}", out.get_pixel(50, 75));
    }

    #[test]
    fn test_overlay_without_transform_is_skipped() {
        let overlay = solid(10, 10, RED);
        let out = ImageCompositor::new()
            .compose(None, Some(&overlay), Size::new(20.0, 20.0), None, BlendMode::Normal)
            .unwrap();
        assert!(out.pixels().all(|p| *p == CLEAR));
    }

    #[test]
    fn test_screen_blend_lightens_base() {
        let base = solid(50, 50, Rgba([128, 128, 128, 255]));
        let overlay = solid(10, 10, Rgba([128, 128, 128, 255]));
        let canvas = Size::new(50.0, 50.0);
        let transform = OverlayTransform::initial(canvas);

        let out = ImageCompositor::new()
            .compose(Some(&base), Some(&overlay), canvas, Some(&transform), BlendMode::Screen)
            .unwrap();

        let center = out.get_pixel(25, 25);
        assert!((i32::from(center[0]) - 192).abs() <= 2, "{center:?}");
        assert_eq!(center[3], 255);
        assert_eq!(*out.get_pixel(1, 1), Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn test_rotation_pivots_on_overlay_center() {
        let band = solid(40, 10, RED);
        let canvas = Size::new(100.0, 100.0);
        let placed = OverlayTransform::initial(canvas);
        let compositor = ImageCompositor::new();

        let flat = compositor
            .compose(None, Some(&band), canvas, Some(&placed), BlendMode::Normal)
            .unwrap();
        assert_eq!(*flat.get_pixel(25, 50), RED);
        assert_eq!(*flat.get_pixel(50, 30), CLEAR);

        let turned = placed.apply(TransformEvent::Rotate(FRAC_PI_2));
        let rotated = compositor
            .compose(None, Some(&band), canvas, Some(&turned), BlendMode::Normal)
            .unwrap();
        assert_eq!(*rotated.get_pixel(25, 50), CLEAR);
        assert_eq!(*rotated.get_pixel(50, 30), RED);
        assert_eq!(*rotated.get_pixel(50, 50), RED);
    }

    #[test]
    fn test_pan_moves_overlay() {
        let overlay = solid(10, 10, RED);
        let canvas = Size::new(100.0, 100.0);
        let moved = OverlayTransform::initial(canvas)
            .apply(TransformEvent::Pinch(0.1))
            .apply(TransformEvent::Pan(kurbo::Vec2::new(30.0, 0.0)));

        let out = ImageCompositor::new()
            .compose(None, Some(&overlay), canvas, Some(&moved), BlendMode::Normal)
            .unwrap();
        assert_eq!(*out.get_pixel(80, 50), RED);
        assert_eq!(*out.get_pixel(50, 50), CLEAR);
    }

    #[test]
    fn test_output_is_deterministic() {
        let mut base = RgbaImage::new(37, 23);
        for (x, y, px) in base.enumerate_pixels_mut() {
            *px = Rgba([(x * 7) as u8, (y * 11) as u8, ((x + y) * 3) as u8, 255]);
        }
        let overlay = solid(9, 13, Rgba([200, 40, 90, 180]));
        let canvas = Size::new(64.0, 48.0);
        let transform = OverlayTransform::initial(canvas).apply_all([
            TransformEvent::Rotate(0.4),
            TransformEvent::Pinch(1.3),
            TransformEvent::Pan(kurbo::Vec2::new(-4.5, 3.25)),
        ]);
        let compositor = ImageCompositor::new();

        let a = compositor
            .compose(Some(&base), Some(&overlay), canvas, Some(&transform), BlendMode::Overlay)
            .unwrap();
        let b = compositor
            .compose(Some(&base), Some(&overlay), canvas, Some(&transform), BlendMode::Overlay)
            .unwrap();
        assert_eq!(a.as_raw(), b.as_raw());
    }
}
