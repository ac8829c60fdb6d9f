//! Screen and image coordinate types.

use serde::{Deserialize, Serialize};

/// A 2D point in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Origin (0, 0).
    pub fn zero() -> Self {
        Self::default()
    }
}

/// An element's bounding box in client (viewport) coordinates, as reported
/// by `getBoundingClientRect`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingRect {
    /// Left edge X coordinate
    pub left: f32,
    /// Top edge Y coordinate
    pub top: f32,
    /// Width of the element
    pub width: f32,
    /// Height of the element
    pub height: f32,
}

impl BoundingRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Offset of a client-space point from this rect's top-left corner.
    ///
    /// The result is not clamped; points outside the rect give negative or
    /// larger-than-size offsets.
    pub fn local_offset(&self, client: Point) -> Point {
        Point::new(client.x - self.left, client.y - self.top)
    }
}

/// A pointer position sampled from a drag event.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointerEvent {
    /// `clientX` of the event
    pub client_x: f32,
    /// `clientY` of the event
    pub client_y: f32,
}

impl PointerEvent {
    pub fn new(client_x: f32, client_y: f32) -> Self {
        Self { client_x, client_y }
    }

    /// The event position as a point.
    pub fn client(&self) -> Point {
        Point::new(self.client_x, self.client_y)
    }
}
