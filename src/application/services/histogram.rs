//! Luminance histogram chart for live preview.

use image::{DynamicImage, RgbaImage};
use kurbo::Size;
use vello_cpu::kurbo::{BezPath, RoundedRect, Shape, Stroke};

use super::compositor::MAX_CANVAS_PIXELS;
use super::raster;

/// Default number of histogram bins.
pub const DEFAULT_BINS: usize = 128;

const CORNER_RADIUS: f64 = 6.0;
const TOLERANCE: f64 = 0.1;
// Straight RGBA8 paints.
const BACKGROUND: [u8; 4] = [255, 255, 255, 153];
const CURVE_FILL: [u8; 4] = [0, 0, 0, 217];
const BORDER: [u8; 4] = [0, 0, 0, 51];

// BT.709 luma weights.
const LUMA_R: f64 = 0.2126;
const LUMA_G: f64 = 0.7152;
const LUMA_B: f64 = 0.0722;

/// Renders small luminance histogram charts.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistogramRenderer;

impl HistogramRenderer {
    /// Creates a renderer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes per-bin luminance mass in 8-bit units.
    ///
    /// Each pixel adds its luminance to the bin its luminance falls in, averaged over
    /// the image and scaled to `0..=255`. A uniform gray image lands in a single bin;
    /// a black image carries no mass at all.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn luminance_histogram(&self, image: &DynamicImage, bins: usize) -> Option<Vec<f64>> {
        if bins == 0 || image.width() == 0 || image.height() == 0 {
            return None;
        }
        let rgba = image.to_rgba8();
        let mut mass = vec![0.0f64; bins];
        for px in rgba.pixels() {
            let luma = (LUMA_R * f64::from(px[0])
                + LUMA_G * f64::from(px[1])
                + LUMA_B * f64::from(px[2]))
                / 255.0;
            let bin = ((luma * bins as f64).floor() as usize).min(bins - 1);
            mass[bin] += luma;
        }

        let count = f64::from(rgba.width()) * f64::from(rgba.height());
        Some(mass.into_iter().map(|m| m / count * 255.0).collect())
    }

    /// Renders the histogram of `image` as a chart of `size` pixels.
    ///
    /// Returns `None` for zero bins, an image without pixels, or a size that is empty
    /// or wider than 65535 pixels in either dimension.
    #[must_use]
    pub fn render(&self, image: &DynamicImage, size: Size, bins: usize) -> Option<RgbaImage> {
        let (width, height) = chart_pixels(size)?;
        let values = self.luminance_histogram(image, bins)?;
        let max_value = values.iter().copied().fold(1.0f64, f64::max);
        let normalized: Vec<f64> = values.iter().map(|v| v / max_value).collect();
        Some(rasterize(&normalized, width, height))
    }

    /// Decodes `bytes` and renders their histogram.
    #[must_use]
    pub fn render_bytes(&self, bytes: &[u8], size: Size, bins: usize) -> Option<RgbaImage> {
        let image = image::load_from_memory(bytes).ok()?;
        self.render(&image, size, bins)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn chart_pixels(size: Size) -> Option<(u16, u16)> {
    if !(size.width.is_finite() && size.height.is_finite() && size.width > 0.0 && size.height > 0.0)
    {
        return None;
    }
    let width = size.width.round();
    let height = size.height.round();
    if !(1.0..=f64::from(u16::MAX)).contains(&width) || !(1.0..=f64::from(u16::MAX)).contains(&height)
    {
        return None;
    }
    let (width, height) = (width as u16, height as u16);
    (u64::from(width) * u64::from(height) <= MAX_CANVAS_PIXELS).then_some((width, height))
}

/// Closed area under the curve through the normalized bin values.
#[allow(clippy::cast_precision_loss)]
fn curve_area(normalized: &[f64], width: f64, height: f64) -> BezPath {
    let level = |v: f64| height - v.clamp(0.0, 1.0) * height;
    let mut path = BezPath::new();
    path.move_to((0.0, height));
    if let [only] = normalized {
        path.line_to((0.0, level(*only)));
        path.line_to((width, level(*only)));
    } else {
        let step = width / (normalized.len() - 1) as f64;
        for (i, v) in normalized.iter().enumerate() {
            path.line_to((i as f64 * step, level(*v)));
        }
    }
    path.line_to((width, height));
    path.close_path();
    path
}

fn paint([r, g, b, a]: [u8; 4]) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(r, g, b, a)
}

fn rasterize(normalized: &[f64], width: u16, height: u16) -> RgbaImage {
    let w = f64::from(width);
    let h = f64::from(height);
    let mut ctx = vello_cpu::RenderContext::new(width, height);
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);

    ctx.set_paint(paint(BACKGROUND));
    ctx.fill_path(&RoundedRect::new(0.0, 0.0, w, h, CORNER_RADIUS).to_path(TOLERANCE));

    ctx.set_paint(paint(CURVE_FILL));
    ctx.fill_path(&curve_area(normalized, w, h));

    ctx.set_paint(paint(BORDER));
    ctx.set_stroke(Stroke::new(1.0));
    ctx.stroke_path(&RoundedRect::new(0.5, 0.5, w - 0.5, h - 0.5, CORNER_RADIUS).to_path(TOLERANCE));

    let mut pixmap = vello_cpu::Pixmap::new(width, height);
    ctx.flush();
    ctx.render_to_pixmap(&mut pixmap);
    raster::pixmap_to_image(&pixmap)
}
