//! Glue between `image` buffers and the CPU renderer, plus layer blending.
//!
//! Shapes and images are rasterized by `vello_cpu` into premultiplied RGBA8 pixmaps.
//! Blend modes are applied when a rendered layer is composited onto the pixmap below
//! it, using the separable formulas over unpremultiplied channels.

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use kurbo::{Affine, Rect};
use serde::{Deserialize, Serialize};

/// How a layer's color combines with what is beneath it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    /// Source-over.
    Normal,
    /// Darkens by multiplying colors.
    Multiply,
    /// Lightens; the inverse of multiplying the inverses.
    #[default]
    Screen,
    /// Multiply or screen depending on the backdrop.
    Overlay,
    /// Keeps the darker color.
    Darken,
    /// Keeps the lighter color.
    Lighten,
    /// Absolute difference.
    Difference,
}

impl BlendMode {
    /// Blends straight (non-premultiplied) channel values.
    fn channel(self, backdrop: f32, source: f32) -> f32 {
        match self {
            Self::Normal => source,
            Self::Multiply => backdrop * source,
            Self::Screen => backdrop + source - backdrop * source,
            Self::Overlay => {
                if backdrop <= 0.5 {
                    2.0 * backdrop * source
                } else {
                    let b = 2.0 * backdrop - 1.0;
                    b + source - b * source
                }
            }
            Self::Darken => backdrop.min(source),
            Self::Lighten => backdrop.max(source),
            Self::Difference => (backdrop - source).abs(),
        }
    }

    /// Composites one premultiplied RGBA8 pixel onto another.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn composite_px(self, dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
        if src[3] == 0 {
            return dst;
        }
        let sa = f32::from(src[3]) / 255.0;
        let da = f32::from(dst[3]) / 255.0;
        let mut out = [0u8; 4];
        for i in 0..3 {
            let sp = f32::from(src[i]) / 255.0;
            let dp = f32::from(dst[i]) / 255.0;
            let sc = (sp / sa).clamp(0.0, 1.0);
            let dc = if da > 0.0 { (dp / da).clamp(0.0, 1.0) } else { 0.0 };
            let mixed = self.channel(dc, sc).clamp(0.0, 1.0);
            let value = sp * (1.0 - da) + dp * (1.0 - sa) + mixed * sa * da;
            out[i] = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        out[3] = ((sa + da * (1.0 - sa)).clamp(0.0, 1.0) * 255.0).round() as u8;
        out
    }

    /// Name used in configuration files and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Multiply => "multiply",
            Self::Screen => "screen",
            Self::Overlay => "overlay",
            Self::Darken => "darken",
            Self::Lighten => "lighten",
            Self::Difference => "difference",
        }
    }
}

impl std::fmt::Display for BlendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composites the premultiplied `src` layer onto `dst` in place.
///
/// Both pixmaps must have the same dimensions; extra pixels in the longer one are
/// left untouched.
pub(crate) fn blend_layer(dst: &mut vello_cpu::Pixmap, src: &vello_cpu::Pixmap, mode: BlendMode) {
    let src = src.data_as_u8_slice();
    for (d, s) in dst.data_as_u8_slice_mut().chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = mode.composite_px([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&out);
    }
}

#[allow(clippy::cast_possible_truncation)]
fn premul(c: u8, a: u8) -> u8 {
    ((u16::from(c) * u16::from(a) + 127) / 255) as u8
}

#[allow(clippy::cast_possible_truncation)]
fn unpremul(c: u8, a: u8) -> u8 {
    ((u16::from(c) * 255 + u16::from(a) / 2) / u16::from(a)).min(255) as u8
}

/// Builds a premultiplied pixmap from a straight-alpha image.
///
/// Returns `None` if a dimension does not fit the renderer's 16-bit limit.
pub(crate) fn pixmap_from_image(image: &RgbaImage) -> Option<vello_cpu::Pixmap> {
    let w = u16::try_from(image.width()).ok()?;
    let h = u16::try_from(image.height()).ok()?;

    let mut may_have_opacities = false;
    let pixels = image
        .pixels()
        .map(|px| {
            let a = px[3];
            may_have_opacities |= a != 255;
            vello_cpu::peniko::color::PremulRgba8 {
                r: premul(px[0], a),
                g: premul(px[1], a),
                b: premul(px[2], a),
                a,
            }
        })
        .collect();

    Some(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

/// Converts a rendered pixmap back to a straight-alpha image.
pub(crate) fn pixmap_to_image(pixmap: &vello_cpu::Pixmap) -> RgbaImage {
    let mut out = RgbaImage::new(u32::from(pixmap.width()), u32::from(pixmap.height()));
    for (dst, px) in out.pixels_mut().zip(pixmap.data_as_u8_slice().chunks_exact(4)) {
        let a = px[3];
        *dst = if a == 0 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([unpremul(px[0], a), unpremul(px[1], a), unpremul(px[2], a), a])
        };
    }
    out
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

/// Fills `dest` with `image` stretched to it, where `transform` maps the frame
/// `dest` is expressed in onto the context.
///
/// Returns false if the image could not be turned into a paint.
pub(crate) fn draw_image(
    ctx: &mut vello_cpu::RenderContext,
    image: &RgbaImage,
    dest: Rect,
    transform: Affine,
) -> bool {
    if image.width() == 0 || image.height() == 0 || dest.width() <= 0.0 || dest.height() <= 0.0 {
        return true;
    }
    let Some(pixmap) = pixmap_from_image(image) else {
        return false;
    };
    let src_w = f64::from(image.width());
    let src_h = f64::from(image.height());
    let image_to_target = transform
        * Affine::translate(dest.origin().to_vec2())
        * Affine::scale_non_uniform(dest.width() / src_w, dest.height() / src_h);

    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(affine_to_cpu(image_to_target));
    ctx.set_paint(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    });
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, src_w, src_h));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const GRAY: [u8; 4] = [128, 128, 128, 255];

    fn close(a: [u8; 4], b: [u8; 4]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| x.abs_diff(*y) <= 1)
    }

    fn render(width: u16, height: u16, draw: impl FnOnce(&mut vello_cpu::RenderContext)) -> RgbaImage {
        let mut ctx = vello_cpu::RenderContext::new(width, height);
        draw(&mut ctx);
        let mut pixmap = vello_cpu::Pixmap::new(width, height);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);
        pixmap_to_image(&pixmap)
    }

    #[test]
    fn test_transparent_source_is_noop() {
        for mode in [BlendMode::Normal, BlendMode::Screen, BlendMode::Difference] {
            assert_eq!(mode.composite_px(GRAY, [0; 4]), GRAY);
        }
    }

    #[test]
    fn test_normal_is_source_over() {
        let half_red = [128, 0, 0, 128];
        let out = BlendMode::Normal.composite_px([0, 0, 255, 255], half_red);
        assert!(close(out, [128, 0, 127, 255]), "{out:?}");
    }

    #[test]
    fn test_blend_onto_transparent_returns_source() {
        let src = [51, 77, 102, 204];
        for mode in [BlendMode::Multiply, BlendMode::Screen, BlendMode::Overlay] {
            assert_eq!(mode.composite_px([0; 4], src), src);
        }
    }

    #[test_case(BlendMode::Multiply, 64 ; "multiply")]
    #[test_case(BlendMode::Screen, 192 ; "screen")]
    #[test_case(BlendMode::Overlay, 128 ; "overlay")]
    #[test_case(BlendMode::Darken, 128 ; "darken")]
    #[test_case(BlendMode::Difference, 0 ; "difference")]
    fn test_opaque_gray_on_gray(mode: BlendMode, expected: u8) {
        let out = mode.composite_px(GRAY, GRAY);
        assert!(close(out, [expected, expected, expected, 255]), "{mode}: {out:?}");
    }

    #[test]
    fn test_screen_never_darkens() {
        let backdrop = [77, 153, 230, 255];
        let out = BlendMode::Screen.composite_px(backdrop, [26, 26, 26, 255]);
        for i in 0..3 {
            assert!(out[i] >= backdrop[i]);
        }
    }

    #[test]
    fn test_pixmap_round_trip_keeps_straight_color() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([200, 100, 50, 128]));
        let back = pixmap_to_image(&pixmap_from_image(&img).unwrap());
        assert!(close(back.get_pixel(0, 0).0, [200, 100, 50, 128]));
        assert_eq!(*back.get_pixel(1, 0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_oversized_image_has_no_pixmap() {
        let wide = RgbaImage::new(u32::from(u16::MAX) + 1, 1);
        assert!(pixmap_from_image(&wide).is_none());
    }

    #[test]
    fn test_draw_image_identity_copies_pixels() {
        let src = RgbaImage::from_fn(4, 4, |x, y| {
            if x < 2 {
                Rgba([255, 0, 0, 255])
            } else if y < 2 {
                Rgba([0, 255, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });

        let out = render(4, 4, |ctx| {
            assert!(draw_image(ctx, &src, Rect::new(0.0, 0.0, 4.0, 4.0), Affine::IDENTITY));
        });
        assert_eq!(out.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(3, 0), &Rgba([0, 255, 0, 255]));
        assert_eq!(out.get_pixel(3, 3), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_draw_image_clips_to_target() {
        let src = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        let out = render(3, 3, |ctx| {
            draw_image(ctx, &src, Rect::new(-10.0, -10.0, 50.0, 50.0), Affine::IDENTITY);
        });
        assert!(out.pixels().all(|p| *p == Rgba([10, 20, 30, 255])));
    }

    #[test]
    fn test_blend_layer_screens_whole_pixmap() {
        let mut dst = pixmap_from_image(&RgbaImage::from_pixel(2, 2, Rgba(GRAY))).unwrap();
        let src = pixmap_from_image(&RgbaImage::from_pixel(2, 2, Rgba(GRAY))).unwrap();
        blend_layer(&mut dst, &src, BlendMode::Screen);
        let out = pixmap_to_image(&dst);
        assert!(out.pixels().all(|p| close(p.0, [192, 192, 192, 255])));
    }
}
