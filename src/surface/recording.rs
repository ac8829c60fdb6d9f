//! A surface that records draw calls instead of rasterizing text.
//!
//! Bitmaps are still copied so the encoded output has the right size and
//! content; text is only logged. Used for headless dry runs and for checking
//! text placement without depending on font rendering.

use std::cell::RefCell;
use std::rc::Rc;

use image::RgbaImage;

use super::{FontSpec, Surface, SurfaceBackend, SurfaceError, allocate, encode_png};

/// A draw call captured by a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    /// Surface allocated
    Created { width: u32, height: u32 },
    /// Bitmap drawn at a position
    DrawImage {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    /// Font selected, as CSS shorthand
    SetFont(String),
    /// Text filled at a baseline
    FillText { text: String, x: f32, y: f32 },
    /// PNG encoded
    Encode,
}

/// Backend whose surfaces share one operation log.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    ops: Rc<RefCell<Vec<SurfaceOp>>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded operation so far.
    pub fn ops(&self) -> Vec<SurfaceOp> {
        self.ops.borrow().clone()
    }

    /// The last text fill, if any.
    pub fn last_fill_text(&self) -> Option<SurfaceOp> {
        self.ops
            .borrow()
            .iter()
            .rev()
            .find(|op| matches!(op, SurfaceOp::FillText { .. }))
            .cloned()
    }
}

impl SurfaceBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn create_surface(&self, width: u32, height: u32) -> Result<Box<dyn Surface>, SurfaceError> {
        let pixels = allocate(width, height)?;
        self.ops
            .borrow_mut()
            .push(SurfaceOp::Created { width, height });
        Ok(Box::new(RecordingSurface {
            pixels,
            ops: Rc::clone(&self.ops),
        }))
    }
}

/// Surface created by [`RecordingBackend`].
#[derive(Debug)]
pub struct RecordingSurface {
    pixels: RgbaImage,
    ops: Rc<RefCell<Vec<SurfaceOp>>>,
}

impl Surface for RecordingSurface {
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn draw_image(&mut self, bitmap: &RgbaImage, x: i32, y: i32) -> Result<(), SurfaceError> {
        image::imageops::overlay(&mut self.pixels, bitmap, i64::from(x), i64::from(y));
        self.ops.borrow_mut().push(SurfaceOp::DrawImage {
            x,
            y,
            width: bitmap.width(),
            height: bitmap.height(),
        });
        Ok(())
    }

    fn set_font(&mut self, font: &FontSpec) {
        self.ops.borrow_mut().push(SurfaceOp::SetFont(font.css()));
    }

    fn fill_text(&mut self, text: &str, x: f32, baseline_y: f32) -> Result<(), SurfaceError> {
        self.ops.borrow_mut().push(SurfaceOp::FillText {
            text: text.to_string(),
            x,
            y: baseline_y,
        });
        Ok(())
    }

    fn encode_png(&self) -> Result<Vec<u8>, SurfaceError> {
        self.ops.borrow_mut().push(SurfaceOp::Encode);
        encode_png(&self.pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_records_operations_in_order() {
        let backend = RecordingBackend::new();
        let mut surface = backend.create_surface(4, 3).unwrap();
        surface.draw_image(&RgbaImage::new(4, 3), 0, 0).unwrap();
        surface.set_font(&FontSpec::new(12, "Arial"));
        surface.fill_text("x", 1.0, 13.0).unwrap();
        surface.encode_png().unwrap();

        assert_eq!(
            backend.ops(),
            vec![
                SurfaceOp::Created { width: 4, height: 3 },
                SurfaceOp::DrawImage {
                    x: 0,
                    y: 0,
                    width: 4,
                    height: 3
                },
                SurfaceOp::SetFont("12px Arial".to_string()),
                SurfaceOp::FillText {
                    text: "x".to_string(),
                    x: 1.0,
                    y: 13.0
                },
                SurfaceOp::Encode,
            ]
        );
    }

    #[test]
    fn test_encoded_pixels_include_drawn_bitmap() {
        let backend = RecordingBackend::new();
        let mut surface = backend.create_surface(2, 2).unwrap();
        let bitmap = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255]));
        surface.draw_image(&bitmap, 0, 0).unwrap();

        let png = surface.encode_png().unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(1, 1), &Rgba([10, 20, 30, 255]));
    }
}
