//! The text annotation overlaid on the uploaded image.

use serde::{Deserialize, Serialize};

use super::geometry::Point;
use crate::constants::DEFAULT_FONT_SIZE_PX;

/// The single user-editable text overlay.
///
/// `position` is the top-left of the text in image-container pixels. Export
/// draws the text with its baseline one font size below that point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Text content
    pub text: String,
    /// Font size in pixels (no bounds enforced)
    pub font_size_px: i32,
    /// Top-left of the text relative to the image container
    pub position: Point,
    /// Whether the text is shown as an editable input
    pub editing: bool,
}

impl Default for Annotation {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size_px: DEFAULT_FONT_SIZE_PX,
            position: Point::zero(),
            editing: false,
        }
    }
}

impl Annotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if there is any text to draw.
    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }

    /// Where the text baseline starts when rasterized.
    ///
    /// The position is treated as the text's top-left; shifting down by one
    /// font size approximates top alignment with a baseline-anchored draw.
    pub fn baseline_origin(&self) -> Point {
        Point::new(self.position.x, self.position.y + self.font_size_px as f32)
    }
}

/// Parse a font size form value the way `parseInt(value, 10)` does.
///
/// Leading whitespace and a single sign are accepted, parsing stops at the
/// first non-digit, and input without leading digits yields `None`. Values
/// beyond `i32` saturate.
pub fn parse_font_size(input: &str) -> Option<i32> {
    let trimmed = input.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude = digits[..end]
        .bytes()
        .fold(0i64, |acc, b| {
            acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
        });
    let value = if negative { -magnitude } else { magnitude };
    Some(value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
}
