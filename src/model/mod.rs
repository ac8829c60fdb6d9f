//! Data models for the captioner application.

mod annotation;
mod geometry;

pub use annotation::{Annotation, parse_font_size};
pub use geometry::{BoundingRect, Point, PointerEvent};
