//! Browser `<canvas>` surface for the WASM build.

use image::RgbaImage;
use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, ImageData};

use super::{FontSpec, Surface, SurfaceBackend, SurfaceError};
use crate::data_url::DataUrl;

fn js_error(context: &str, err: JsValue) -> SurfaceError {
    SurfaceError::Backend(format!("{}: {:?}", context, err))
}

/// Allocates detached canvas elements.
#[derive(Debug, Clone)]
pub struct CanvasBackend {
    document: Document,
    fill_style: String,
}

impl CanvasBackend {
    /// Create a backend using the page's document.
    pub fn new(text_color: [u8; 4]) -> Result<Self, SurfaceError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| SurfaceError::Backend("No document available".to_string()))?;
        let [r, g, b, a] = text_color;
        Ok(Self {
            document,
            fill_style: format!("rgba({}, {}, {}, {:.3})", r, g, b, f32::from(a) / 255.0),
        })
    }
}

impl SurfaceBackend for CanvasBackend {
    fn name(&self) -> &'static str {
        "canvas"
    }

    fn create_surface(&self, width: u32, height: u32) -> Result<Box<dyn Surface>, SurfaceError> {
        if width == 0 || height == 0 {
            return Err(SurfaceError::Allocation { width, height });
        }

        let canvas: HtmlCanvasElement = self
            .document
            .create_element("canvas")
            .map_err(|e| js_error("create canvas", e))?
            .dyn_into()
            .map_err(|_| SurfaceError::Backend("not a canvas element".to_string()))?;
        canvas.set_width(width);
        canvas.set_height(height);

        let context: CanvasRenderingContext2d = canvas
            .get_context("2d")
            .map_err(|e| js_error("get 2d context", e))?
            .ok_or_else(|| SurfaceError::Backend("2d context unavailable".to_string()))?
            .dyn_into()
            .map_err(|_| SurfaceError::Backend("not a 2d context".to_string()))?;

        #[expect(deprecated)]
        context.set_fill_style(&JsValue::from_str(&self.fill_style));

        Ok(Box::new(CanvasSurface { canvas, context }))
    }
}

/// A detached canvas and its 2D context.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl Surface for CanvasSurface {
    fn width(&self) -> u32 {
        self.canvas.width()
    }

    fn height(&self) -> u32 {
        self.canvas.height()
    }

    fn draw_image(&mut self, bitmap: &RgbaImage, x: i32, y: i32) -> Result<(), SurfaceError> {
        // The bitmap is already decoded, so there is no <img> load to wait on.
        let data = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(bitmap.as_raw().as_slice()),
            bitmap.width(),
            bitmap.height(),
        )
        .map_err(|e| js_error("create ImageData", e))?;
        self.context
            .put_image_data(&data, f64::from(x), f64::from(y))
            .map_err(|e| js_error("putImageData", e))
    }

    fn set_font(&mut self, font: &FontSpec) {
        self.context.set_font(&font.css());
    }

    fn fill_text(&mut self, text: &str, x: f32, baseline_y: f32) -> Result<(), SurfaceError> {
        self.context
            .fill_text(text, f64::from(x), f64::from(baseline_y))
            .map_err(|e| js_error("fillText", e))
    }

    fn encode_png(&self) -> Result<Vec<u8>, SurfaceError> {
        let url = self
            .canvas
            .to_data_url_with_type("image/png")
            .map_err(|e| js_error("toDataURL", e))?;
        DataUrl::parse(&url)
            .map(DataUrl::into_data)
            .map_err(|e| SurfaceError::Backend(format!("canvas returned bad data URL: {}", e)))
    }
}
