//! Off-screen raster targets used to compose the exported image.
//!
//! A [`Surface`] mirrors the small slice of the 2D canvas API the export
//! routine needs: draw a bitmap, pick a font, fill text at a baseline, and
//! encode the result. A [`SurfaceBackend`] allocates surfaces; the native
//! build rasterizes in software, the browser build draws on a `<canvas>`.

mod raster;
mod recording;

#[cfg(target_arch = "wasm32")]
mod canvas;

pub mod font;

use std::io::Cursor;

use image::RgbaImage;
use thiserror::Error;

pub use raster::{RasterBackend, RasterSurface};
pub use recording::{RecordingBackend, SurfaceOp};

#[cfg(target_arch = "wasm32")]
pub use canvas::CanvasBackend;

/// Errors raised while composing or encoding a surface.
#[derive(Error, Debug)]
pub enum SurfaceError {
    /// Requested size cannot be allocated
    #[error("Cannot allocate a {width}x{height} surface")]
    Allocation {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// A glyph's coverage box is too large to rasterize
    #[error("Glyph of {width}x{height} pixels is too large to draw")]
    GlyphTooLarge {
        /// Glyph box width
        width: u32,
        /// Glyph box height
        height: u32,
    },

    /// Text was requested but no font could be loaded
    #[error("No font available to draw text")]
    FontUnavailable,

    /// Encoding the pixels failed
    #[error("Image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    /// Platform drawing API reported an error
    #[error("Surface backend error: {0}")]
    Backend(String),
}

/// Font selection for text drawing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSpec {
    /// Em size in pixels
    pub size_px: i32,
    /// Font family name
    pub family: String,
}

impl FontSpec {
    pub fn new(size_px: i32, family: impl Into<String>) -> Self {
        Self {
            size_px,
            family: family.into(),
        }
    }

    /// CSS font shorthand, e.g. `20px Arial`.
    pub fn css(&self) -> String {
        format!("{}px {}", self.size_px, self.family)
    }
}

impl Default for FontSpec {
    /// The 2D canvas default font.
    fn default() -> Self {
        Self::new(10, "sans-serif")
    }
}

/// A drawable off-screen raster target.
pub trait Surface {
    /// Surface width in pixels.
    fn width(&self) -> u32;

    /// Surface height in pixels.
    fn height(&self) -> u32;

    /// Draw a bitmap with its top-left corner at `(x, y)`.
    fn draw_image(&mut self, bitmap: &RgbaImage, x: i32, y: i32) -> Result<(), SurfaceError>;

    /// Select the font used by subsequent [`Surface::fill_text`] calls.
    fn set_font(&mut self, font: &FontSpec);

    /// Fill `text` starting at `x` with its alphabetic baseline at `baseline_y`.
    fn fill_text(&mut self, text: &str, x: f32, baseline_y: f32) -> Result<(), SurfaceError>;

    /// Encode the current pixels as PNG.
    fn encode_png(&self) -> Result<Vec<u8>, SurfaceError>;
}

/// Allocates surfaces for export.
pub trait SurfaceBackend {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Allocate a transparent surface of the given size.
    fn create_surface(&self, width: u32, height: u32) -> Result<Box<dyn Surface>, SurfaceError>;
}

/// Encode an RGBA bitmap as PNG bytes.
pub fn encode_png(bitmap: &RgbaImage) -> Result<Vec<u8>, SurfaceError> {
    let mut bytes = Vec::new();
    bitmap.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}

/// Allocate a transparent bitmap, rejecting empty sizes.
fn allocate(width: u32, height: u32) -> Result<RgbaImage, SurfaceError> {
    if width == 0 || height == 0 {
        return Err(SurfaceError::Allocation { width, height });
    }
    Ok(RgbaImage::new(width, height))
}
