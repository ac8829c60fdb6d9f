//! Software rasterizer backed by `image` and `ab_glyph`.

use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont, point};
use image::{Rgba, RgbaImage};

use super::{FontSpec, Surface, SurfaceBackend, SurfaceError, allocate, encode_png};

/// Glyph coverage buffers may cover at most this many surface areas.
const GLYPH_AREA_FACTOR: f64 = 16.0;

/// Surface area used for the glyph limit on very small surfaces.
const MIN_GLYPH_AREA: f64 = 65_536.0;

/// Convert a CSS-style em size into the glyph scale `ab_glyph` expects.
///
/// `ab_glyph` scales by ascent-to-descent height, canvas fonts by em size.
fn em_scale(font: &FontArc, size_px: f32) -> PxScale {
    match font.units_per_em() {
        Some(units_per_em) if units_per_em > 0.0 => {
            PxScale::from(size_px * font.height_unscaled() / units_per_em)
        }
        _ => PxScale::from(size_px),
    }
}


/// Source-over blend of `color` scaled by `coverage` into one pixel.
fn blend_pixel(img: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= img.width() as i32 || y >= img.height() as i32 {
        return;
    }
    let src_a = f32::from(color[3]) / 255.0 * coverage.clamp(0.0, 1.0);
    if src_a <= 0.0 {
        return;
    }

    let dst = img.get_pixel_mut(x as u32, y as u32);
    let dst_a = f32::from(dst[3]) / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    for channel in 0..3 {
        let src_c = f32::from(color[channel]);
        let dst_c = f32::from(dst[channel]);
        let out_c = (src_c * src_a + dst_c * dst_a * (1.0 - src_a)) / out_a;
        dst[channel] = out_c.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Allocates [`RasterSurface`]s that share one font and text colour.
#[derive(Clone)]
pub struct RasterBackend {
    font: Option<FontArc>,
    color: Rgba<u8>,
}

impl RasterBackend {
    /// Create a backend. Without a font, only empty text can be drawn.
    pub fn new(font: Option<FontArc>, color: [u8; 4]) -> Self {
        Self {
            font,
            color: Rgba(color),
        }
    }
}

impl std::fmt::Debug for RasterBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterBackend")
            .field("has_font", &self.font.is_some())
            .field("color", &self.color)
            .finish()
    }
}

impl SurfaceBackend for RasterBackend {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn create_surface(&self, width: u32, height: u32) -> Result<Box<dyn Surface>, SurfaceError> {
        Ok(Box::new(RasterSurface {
            pixels: allocate(width, height)?,
            font: self.font.clone(),
            font_spec: FontSpec::default(),
            color: self.color,
        }))
    }
}

/// An in-memory RGBA surface.
///
/// Text is drawn with the backend's single loaded font; the family named in
/// [`FontSpec`] only matters for the browser canvas.
pub struct RasterSurface {
    pixels: RgbaImage,
    font: Option<FontArc>,
    font_spec: FontSpec,
    color: Rgba<u8>,
}

impl Surface for RasterSurface {
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn draw_image(&mut self, bitmap: &RgbaImage, x: i32, y: i32) -> Result<(), SurfaceError> {
        image::imageops::overlay(&mut self.pixels, bitmap, i64::from(x), i64::from(y));
        Ok(())
    }

    fn set_font(&mut self, font: &FontSpec) {
        self.font_spec = font.clone();
    }

    fn fill_text(&mut self, text: &str, x: f32, baseline_y: f32) -> Result<(), SurfaceError> {
        if text.is_empty() {
            return Ok(());
        }
        let Some(font) = self.font.as_ref() else {
            return Err(SurfaceError::FontUnavailable);
        };
        if self.font_spec.size_px <= 0 {
            log::warn!(
                "Skipping text draw with non-positive font size {}",
                self.font_spec.size_px
            );
            return Ok(());
        }

        let scale = em_scale(font, self.font_spec.size_px as f32);
        let scaled = font.as_scaled(scale);
        let color = self.color;
        let (width, height) = (self.pixels.width() as f32, self.pixels.height() as f32);
        let glyph_area_limit =
            (f64::from(width) * f64::from(height)).max(MIN_GLYPH_AREA) * GLYPH_AREA_FACTOR;
        let pixels = &mut self.pixels;

        let mut caret = point(x, baseline_y);
        let mut previous: Option<GlyphId> = None;
        for ch in text.chars().filter(|c| !c.is_control()) {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                caret.x += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(scale, caret);
            caret.x += scaled.h_advance(id);
            previous = Some(id);

            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                let overlaps = bounds.max.x > 0.0
                    && bounds.min.x < width
                    && bounds.max.y > 0.0
                    && bounds.min.y < height;
                if !overlaps {
                    continue;
                }
                // The rasterizer allocates the glyph's full box, visible or not
                let area = f64::from(bounds.width()) * f64::from(bounds.height());
                if area.is_nan() || area > glyph_area_limit {
                    return Err(SurfaceError::GlyphTooLarge {
                        width: bounds.width() as u32,
                        height: bounds.height() as u32,
                    });
                }
                outlined.draw(|gx, gy, coverage| {
                    let px = bounds.min.x as i32 + gx as i32;
                    let py = bounds.min.y as i32 + gy as i32;
                    blend_pixel(pixels, px, py, color, coverage);
                });
            }
        }

        log::trace!(
            "Rasterized {:?} at ({:.1}, {:.1}) with {}",
            text,
            x,
            baseline_y,
            self.font_spec.css()
        );
        Ok(())
    }

    fn encode_png(&self) -> Result<Vec<u8>, SurfaceError> {
        encode_png(&self.pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::font::load_font;

    /// Horizontal advance and ascent of one line of text.
    struct TextExtent {
        width: f32,
        ascent: f32,
    }

    fn measure_text(font: &FontArc, size_px: f32, text: &str) -> TextExtent {
        let scaled = font.as_scaled(em_scale(font, size_px));
        let mut width = 0.0;
        let mut previous: Option<GlyphId> = None;
        for ch in text.chars().filter(|c| !c.is_control()) {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            previous = Some(id);
        }
        TextExtent {
            width,
            ascent: scaled.ascent(),
        }
    }

    #[test]
    fn test_blend_full_coverage_replaces() {
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]));
        blend_pixel(&mut img, 0, 0, Rgba([0, 0, 0, 255]), 1.0);
        assert_eq!(img.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_blend_half_coverage_mixes() {
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]));
        blend_pixel(&mut img, 0, 0, Rgba([0, 0, 0, 255]), 0.5);
        let px = img.get_pixel(0, 0);
        assert!((127..=128).contains(&px[0]));
        assert_eq!(px[3], 255);
    }

    #[test]
    fn test_blend_onto_transparent_keeps_color() {
        let mut img = RgbaImage::new(1, 1);
        blend_pixel(&mut img, 0, 0, Rgba([200, 10, 10, 255]), 0.5);
        let px = img.get_pixel(0, 0);
        assert_eq!((px[0], px[1], px[2]), (200, 10, 10));
        assert!((127..=128).contains(&px[3]));
    }

    #[test]
    fn test_blend_clips_out_of_bounds() {
        let mut img = RgbaImage::new(2, 2);
        blend_pixel(&mut img, -1, 0, Rgba([0, 0, 0, 255]), 1.0);
        blend_pixel(&mut img, 0, 2, Rgba([0, 0, 0, 255]), 1.0);
        assert!(img.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_draw_image_offset_clips() {
        let backend = RasterBackend::new(None, [0, 0, 0, 255]);
        let mut surface = backend.create_surface(4, 4).unwrap();
        let bitmap = RgbaImage::from_pixel(3, 3, Rgba([9, 9, 9, 255]));
        surface.draw_image(&bitmap, 2, 2).unwrap();

        let png = surface.encode_png().unwrap();
        let out = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(out.get_pixel(3, 3), &Rgba([9, 9, 9, 255]));
        assert_eq!(out.get_pixel(1, 1)[3], 0);
    }

    #[test]
    fn test_empty_text_needs_no_font() {
        let backend = RasterBackend::new(None, [0, 0, 0, 255]);
        let mut surface = backend.create_surface(4, 4).unwrap();
        surface.set_font(&FontSpec::new(16, "Arial"));
        assert!(surface.fill_text("", 0.0, 16.0).is_ok());
    }

    #[test]
    fn test_text_without_font_fails() {
        let backend = RasterBackend::new(None, [0, 0, 0, 255]);
        let mut surface = backend.create_surface(4, 4).unwrap();
        assert!(matches!(
            surface.fill_text("Hi", 0.0, 16.0),
            Err(SurfaceError::FontUnavailable)
        ));
    }

    #[test]
    fn test_text_lands_right_of_x_and_above_baseline() {
        // Only meaningful where a system font exists.
        let Some(font) = load_font(None) else {
            return;
        };
        let backend = RasterBackend::new(Some(font.clone()), [0, 0, 0, 255]);
        let mut surface = backend.create_surface(120, 80).unwrap();
        surface.set_font(&FontSpec::new(20, "Arial"));
        surface.fill_text("Hi", 10.0, 50.0).unwrap();

        let png = surface.encode_png().unwrap();
        let out = image::load_from_memory(&png).unwrap().to_rgba8();
        let inked: Vec<(u32, u32)> = out
            .enumerate_pixels()
            .filter(|(_, _, p)| p[3] > 0)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!inked.is_empty());

        let extent = measure_text(&font, 20.0, "Hi");
        let min_x = inked.iter().map(|(x, _)| *x).min().unwrap();
        let max_x = inked.iter().map(|(x, _)| *x).max().unwrap();
        let min_y = inked.iter().map(|(_, y)| *y).min().unwrap();
        let max_y = inked.iter().map(|(_, y)| *y).max().unwrap();

        // "Hi" has no descenders: ink sits between the ascent line and baseline.
        assert!(min_x >= 9);
        assert!(max_x as f32 <= 10.0 + extent.width + 1.0);
        assert!(min_y as f32 >= 50.0 - extent.ascent - 1.0);
        assert!(max_y <= 51);
    }

    #[test]
    fn test_oversized_glyph_is_rejected() {
        let Some(font) = load_font(None) else {
            return;
        };
        let backend = RasterBackend::new(Some(font), [0, 0, 0, 255]);
        let mut surface = backend.create_surface(64, 48).unwrap();
        surface.set_font(&FontSpec::new(1_000_000, "Arial"));

        // Cap height straddles the surface, so the glyph box overlaps it
        let result = surface.fill_text("H", -250_000.0, 400_000.0);

        assert!(matches!(result, Err(SurfaceError::GlyphTooLarge { .. })));
    }

    #[test]
    fn test_offscreen_glyphs_are_skipped() {
        let Some(font) = load_font(None) else {
            return;
        };
        let backend = RasterBackend::new(Some(font), [0, 0, 0, 255]);
        let mut surface = backend.create_surface(64, 48).unwrap();
        surface.set_font(&FontSpec::new(1_000_000, "Arial"));

        surface.fill_text("Hi", 0.0, 1_000_000.0).unwrap();

        let png = surface.encode_png().unwrap();
        let out = image::load_from_memory(&png).unwrap().to_rgba8();
        assert!(out.pixels().all(|p| p[3] == 0));
    }
}
