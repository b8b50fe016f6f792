//! Axis-aligned rectangles in image pixel coordinates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle stored as `(x_min, y_min, x_max, y_max)`.
///
/// Nothing forces `x_max >= x_min` or `y_max >= y_min`. Inverted and
/// zero-sized rectangles are valid values; their [`area`](Rect::area) is
/// zero or negative and the overlap maths downstream copes with that.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Rect {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Create from a top-left corner plus width and height
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Rectangle spanned by a mouse drag. Each axis is sorted, so dragging
    /// up or left still yields a normalised rectangle.
    pub fn from_drag(start: Point, end: Point) -> Self {
        Self::new(
            start.x.min(end.x),
            start.y.min(end.y),
            start.x.max(end.x),
            start.y.max(end.y),
        )
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Signed area, not clamped at zero.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    /// True when both sides are strictly positive
    pub fn is_proper(&self) -> bool {
        self.width() > 0.0 && self.height() > 0.0
    }

    /// Whether a hand-drawn rectangle is big enough to keep.
    pub fn is_drawable(&self, min_side: f64) -> bool {
        self.width() >= min_side && self.height() >= min_side
    }

    /// Same rectangle with each axis sorted
    pub fn normalized(&self) -> Self {
        Self::from_drag(
            Point::new(self.x_min, self.y_min),
            Point::new(self.x_max, self.y_max),
        )
    }

    pub fn to_tuple(&self) -> (f64, f64, f64, f64) {
        (self.x_min, self.y_min, self.x_max, self.y_max)
    }
}

impl From<(f64, f64, f64, f64)> for Rect {
    fn from((x_min, y_min, x_max, y_max): (f64, f64, f64, f64)) -> Self {
        Self::new(x_min, y_min, x_max, y_max)
    }
}

impl From<[f64; 4]> for Rect {
    fn from([x_min, y_min, x_max, y_max]: [f64; 4]) -> Self {
        Self::new(x_min, y_min, x_max, y_max)
    }
}

impl From<Rect> for (f64, f64, f64, f64) {
    fn from(rect: Rect) -> Self {
        rect.to_tuple()
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.x_min, self.y_min, self.x_max, self.y_max
        )
    }
}
