//! Overlay placement and the gesture reducer that updates it.
//!
//! Gestures arrive as incremental samples: pan deltas are relative to the previous
//! sample, pinch and rotate samples are composed onto the current matrix in the
//! overlay's local frame. Independent gesture streams can therefore update the same
//! transform without agreeing on a baseline.

use kurbo::{Affine, Point, Size, Vec2};

/// Fraction of the canvas an overlay occupies when first placed.
pub const INITIAL_OVERLAY_FRACTION: f64 = 0.6;

/// Determinants below this are treated as singular.
const MIN_DETERMINANT: f64 = 1e-12;

/// A single gesture sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformEvent {
    /// Move the overlay center by a delta in canvas coordinates.
    Pan(Vec2),
    /// Scale uniformly by a factor about the overlay center.
    Pinch(f64),
    /// Rotate by an angle in radians about the overlay center.
    Rotate(f64),
}

/// User-applied placement of an overlay on the base canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayTransform {
    /// Overlay center in canvas coordinates.
    pub center: Point,
    /// Untransformed bounding box of the overlay.
    pub size: Size,
    /// Accumulated rotation and scale; always invertible.
    pub rotation_scale: Affine,
}

impl OverlayTransform {
    /// Initial placement for a canvas: centered, 60% of each dimension, identity matrix.
    #[must_use]
    pub fn initial(canvas: Size) -> Self {
        Self {
            center: Point::new(canvas.width / 2.0, canvas.height / 2.0),
            size: Size::new(
                canvas.width * INITIAL_OVERLAY_FRACTION,
                canvas.height * INITIAL_OVERLAY_FRACTION,
            ),
            rotation_scale: Affine::IDENTITY,
        }
    }

    /// Applies one gesture sample and returns the new transform.
    ///
    /// Samples that would make the matrix singular or non-finite are ignored.
    #[must_use]
    pub fn apply(self, event: TransformEvent) -> Self {
        match event {
            TransformEvent::Pan(delta) => {
                if !(delta.x.is_finite() && delta.y.is_finite()) {
                    return self;
                }
                Self {
                    center: self.center + delta,
                    ..self
                }
            }
            TransformEvent::Pinch(factor) => {
                if !(factor.is_finite() && factor > 0.0) {
                    return self;
                }
                self.with_matrix(self.rotation_scale * Affine::scale(factor))
            }
            TransformEvent::Rotate(angle) => {
                if !angle.is_finite() {
                    return self;
                }
                self.with_matrix(self.rotation_scale * Affine::rotate(angle))
            }
        }
    }

    /// Applies a sequence of samples in order.
    #[must_use]
    pub fn apply_all(self, events: impl IntoIterator<Item = TransformEvent>) -> Self {
        events.into_iter().fold(self, Self::apply)
    }

    /// Maps the overlay's local frame (origin at the top-left of `size`) onto the canvas.
    ///
    /// Equivalent to translating to `center`, applying `rotation_scale` and translating
    /// back by half the size, so rotation and scale pivot on the overlay's own center.
    #[must_use]
    pub fn local_to_canvas(&self) -> Affine {
        Affine::translate(self.center.to_vec2())
            * self.rotation_scale
            * Affine::translate(Vec2::new(-self.size.width / 2.0, -self.size.height / 2.0))
    }

    fn with_matrix(self, candidate: Affine) -> Self {
        let finite = candidate.as_coeffs().iter().all(|c| c.is_finite());
        if !finite || candidate.determinant().abs() < MIN_DETERMINANT {
            return self;
        }
        Self {
            rotation_scale: candidate,
            ..self
        }
    }
}
