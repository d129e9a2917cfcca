//! Layout helpers shared by the compositor and the editing session.

use kurbo::{Point, Rect, Size};

/// Returns the largest rectangle with `content`'s aspect ratio that fits centered in
/// `container`.
///
/// If either size has a non-positive dimension the whole container rect is returned.
#[must_use]
pub fn aspect_fit_rect(content: Size, container: Size) -> Rect {
    if !(content.width > 0.0
        && content.height > 0.0
        && container.width > 0.0
        && container.height > 0.0)
    {
        return Rect::from_origin_size(Point::ZERO, container);
    }

    let scale = (container.width / content.width).min(container.height / content.height);
    let size = Size::new(content.width * scale, content.height * scale);
    let origin = Point::new(
        (container.width - size.width) / 2.0,
        (container.height - size.height) / 2.0,
    );
    Rect::from_origin_size(origin, size)
}

/// Pixel dimensions of an image as a [`Size`].
#[must_use]
pub fn image_size(width: u32, height: u32) -> Size {
    Size::new(f64::from(width), f64::from(height))
}
