//! Overlay compositor: annotation editing, dragging and export.
//!
//! Drag coordinates follow the browser behaviour the overlay was built
//! against: `begin_drag` records the pointer offset inside the dragged text
//! element, while `drag_over` records it inside the image container. The
//! first is element-local and the second container-local; exported output
//! depends on the last value written, so the two are kept as they are.

use crate::constants::{DEFAULT_FONT_FAMILY, EXPORT_FILE_NAME, PLACEHOLDER_TEXT};
use crate::export::{ExportArtifact, ExportError};
use crate::intake::UploadedImage;
use crate::model::{Annotation, BoundingRect, PointerEvent, parse_font_size};
use crate::surface::{FontSpec, SurfaceBackend};

/// Mouse cursor shown over the draggable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// Idle, text can be picked up
    Grab,
    /// Drag in progress
    Grabbing,
}

impl Cursor {
    /// CSS cursor keyword.
    pub fn as_css(&self) -> &'static str {
        match self {
            Cursor::Grab => "grab",
            Cursor::Grabbing => "grabbing",
        }
    }
}

/// How the overlay text is presented.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    /// Left offset in the image container, pixels
    pub left: f32,
    /// Top offset in the image container, pixels
    pub top: f32,
    /// Font size in pixels
    pub font_size_px: i32,
    /// Cursor over the text
    pub cursor: Cursor,
    /// Shown as a text input rather than a draggable label
    pub editable: bool,
}

impl OverlayStyle {
    /// Inline CSS for the draggable label.
    pub fn to_css(&self) -> String {
        format!(
            "font-size: {}px; position: absolute; top: {}px; left: {}px; cursor: {};",
            self.font_size_px,
            self.top,
            self.left,
            self.cursor.as_css()
        )
    }
}

/// Owns the annotation and drag state, and composes exports.
#[derive(Debug, Clone)]
pub struct OverlayCompositor {
    annotation: Annotation,
    dragging: bool,
    font_family: String,
}

impl Default for OverlayCompositor {
    fn default() -> Self {
        Self::new(DEFAULT_FONT_FAMILY)
    }
}

impl OverlayCompositor {
    /// Create a compositor with a fresh annotation.
    pub fn new(font_family: impl Into<String>) -> Self {
        Self {
            annotation: Annotation::default(),
            dragging: false,
            font_family: font_family.into(),
        }
    }

    /// Current annotation state.
    pub fn annotation(&self) -> &Annotation {
        &self.annotation
    }

    /// Check if a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Reset annotation and drag state to session defaults.
    pub fn reset(&mut self) {
        self.annotation = Annotation::default();
        self.dragging = false;
    }

    /// Put placeholder text in the annotation and enter edit mode.
    pub fn start_text_entry(&mut self) {
        self.annotation.text = PLACEHOLDER_TEXT.to_string();
        self.annotation.editing = true;
        log::debug!("✏️  Text entry started");
    }

    /// Set the font size. Any integer is accepted.
    pub fn set_font_size(&mut self, size_px: i32) {
        self.annotation.font_size_px = size_px;
        log::debug!("Font size: {}px", size_px);
    }

    /// Set the font size from a form value; unparseable input is ignored.
    ///
    /// Returns whether the size changed.
    pub fn set_font_size_input(&mut self, input: &str) -> bool {
        match parse_font_size(input) {
            Some(size) => {
                self.set_font_size(size);
                true
            }
            None => {
                log::debug!("Ignoring font size input {:?}", input);
                false
            }
        }
    }

    /// Replace the text. Ignored unless editing.
    pub fn set_text(&mut self, text: impl Into<String>) -> bool {
        if !self.annotation.editing {
            log::debug!("Text change ignored outside edit mode");
            return false;
        }
        self.annotation.text = text.into();
        true
    }

    /// Leave edit mode so the text can be dragged.
    pub fn finish_editing(&mut self) {
        self.annotation.editing = false;
        log::debug!("✏️  Text entry finished: {:?}", self.annotation.text);
    }

    /// Start dragging the text element.
    ///
    /// `element` is the dragged text's bounding box; the position becomes
    /// the pointer offset inside it.
    pub fn begin_drag(&mut self, pointer: PointerEvent, element: BoundingRect) {
        self.dragging = true;
        self.annotation.position = element.local_offset(pointer.client());
        log::debug!(
            "Drag started at element offset ({:.1}, {:.1})",
            self.annotation.position.x,
            self.annotation.position.y
        );
    }

    /// Track the pointer over the image container while dragging.
    ///
    /// Returns whether the position was updated.
    pub fn drag_over(&mut self, pointer: PointerEvent, container: BoundingRect) -> bool {
        if !self.dragging {
            return false;
        }
        self.annotation.position = container.local_offset(pointer.client());
        log::trace!(
            "Dragged to ({:.1}, {:.1})",
            self.annotation.position.x,
            self.annotation.position.y
        );
        true
    }

    /// Stop dragging. The last position is kept.
    pub fn end_drag(&mut self) {
        self.dragging = false;
        log::debug!(
            "Drag ended at ({:.1}, {:.1})",
            self.annotation.position.x,
            self.annotation.position.y
        );
    }

    /// Presentation of the overlay text for the current state.
    pub fn overlay_style(&self) -> OverlayStyle {
        OverlayStyle {
            left: self.annotation.position.x,
            top: self.annotation.position.y,
            font_size_px: self.annotation.font_size_px,
            cursor: if self.dragging {
                Cursor::Grabbing
            } else {
                Cursor::Grab
            },
            editable: self.annotation.editing,
        }
    }

    /// The font the export draws with.
    pub fn font_spec(&self) -> FontSpec {
        FontSpec::new(self.annotation.font_size_px, self.font_family.clone())
    }

    /// Rasterize the image with the annotation text into a PNG.
    ///
    /// The surface matches the image's natural size. The text is drawn with
    /// its baseline one font size below the annotation position.
    pub fn export_image(
        &self,
        image: &UploadedImage,
        backend: &dyn SurfaceBackend,
    ) -> Result<ExportArtifact, ExportError> {
        let bitmap = image.decode()?;
        let (width, height) = bitmap.dimensions();

        let mut surface = backend.create_surface(width, height)?;
        surface.draw_image(&bitmap, 0, 0)?;
        surface.set_font(&self.font_spec());

        if !self.annotation.has_text() {
            log::debug!("Exporting without caption text");
        }
        let origin = self.annotation.baseline_origin();
        surface.fill_text(&self.annotation.text, origin.x, origin.y)?;

        let png = surface.encode_png()?;
        log::info!(
            "🖼️  Composed {}x{} export on {} surface ({} bytes)",
            width,
            height,
            backend.name(),
            png.len()
        );

        Ok(ExportArtifact {
            file_name: EXPORT_FILE_NAME.to_string(),
            png,
            width,
            height,
        })
    }
}
