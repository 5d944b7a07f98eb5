//! Axis-aligned rectangles in surface pixel space.

use std::fmt;

use nalgebra::Vector2;

/// An axis-aligned rectangle.
///
/// Rectangles are allowed to have zero height and/or width. Negative dimensions are not allowed.
#[derive(Clone, Copy, PartialEq)]
pub struct Rect {
    center: Vector2<f32>,
    size: Vector2<f32>,
}

impl Rect {
    /// Creates a rectangle extending outwards from a center point.
    #[inline]
    pub fn from_center(x_center: f32, y_center: f32, width: f32, height: f32) -> Self {
        Self {
            center: Vector2::new(x_center, y_center),
            size: Vector2::new(width, height),
        }
    }

    /// Creates a rectangle extending downwards and right from a point.
    #[inline]
    pub fn from_top_left(top_left_x: f32, top_left_y: f32, width: f32, height: f32) -> Self {
        Self::from_center(
            top_left_x + width * 0.5,
            top_left_y + height * 0.5,
            width,
            height,
        )
    }

    /// Returns the X coordinate of the left side of the rectangle.
    #[inline]
    pub fn x(&self) -> f32 {
        self.center.x - self.size.x * 0.5
    }

    /// Returns the Y coordinate of the top side of the rectangle.
    #[inline]
    pub fn y(&self) -> f32 {
        self.center.y - self.size.y * 0.5
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.size.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.size.y
    }

    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.center.x, self.center.y)
    }

    /// Returns a [`Rect`] with the same size, moved so that its top left corner is at `(x, y)`.
    #[must_use]
    pub fn move_to(&self, x: f32, y: f32) -> Self {
        Self::from_top_left(x, y, self.width(), self.height())
    }

    /// Reflects this rectangle around the vertical center line of a surface that is
    /// `surface_width` pixels wide.
    ///
    /// The left edge of the result is at `surface_width - x - width`.
    #[must_use]
    pub fn mirror_horizontal(&self, surface_width: f32) -> Self {
        self.move_to(surface_width - self.x() - self.width(), self.y())
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect @ ({},{})/{}x{}",
            self.x(),
            self.y(),
            self.width(),
            self.height()
        )
    }
}
