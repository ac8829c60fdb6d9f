//! The editing session: intake, overlay and export behind one controller.
//!
//! The editor owns its ports (storage, surface backend, download sink) so a
//! UI layer only sends [`Message`]s and reads state back. Overlay messages
//! are ignored while no image is loaded, matching a UI that hides the
//! overlay controls until an upload succeeds.

use crate::compositor::{OverlayCompositor, OverlayStyle};
use crate::error::EditorError;
use crate::export::{DownloadSink, ExportArtifact, ExportError};
use crate::intake::{ImageIntake, IntakeError, SelectedFile, UploadedImage};
use crate::message::{Message, Outcome};
use crate::model::Annotation;
use crate::storage::StoragePort;
use crate::surface::SurfaceBackend;

/// A single-image, single-annotation editing session.
pub struct Editor {
    intake: ImageIntake,
    compositor: OverlayCompositor,
    storage: Box<dyn StoragePort>,
    backend: Box<dyn SurfaceBackend>,
    sink: Box<dyn DownloadSink>,
    last_error: Option<String>,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("intake", &self.intake)
            .field("compositor", &self.compositor)
            .field("backend", &self.backend.name())
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl Editor {
    /// Start a session. A previously stored image is restored; the
    /// annotation always starts fresh.
    pub fn new(
        storage: Box<dyn StoragePort>,
        backend: Box<dyn SurfaceBackend>,
        sink: Box<dyn DownloadSink>,
        font_family: &str,
    ) -> Self {
        let intake = ImageIntake::restore(storage.as_ref());
        Self {
            intake,
            compositor: OverlayCompositor::new(font_family),
            storage,
            backend,
            sink,
            last_error: None,
        }
    }

    /// Apply a message.
    pub fn update(&mut self, message: Message) -> Result<Outcome, EditorError> {
        let outcome = match message {
            Message::FilesSelected(files) => Outcome::changed_if(self.select_files(files) > 0),
            Message::CancelSelection => {
                let had_pending = self.intake.has_pending();
                self.cancel();
                Outcome::changed_if(had_pending)
            }
            Message::ConfirmUpload => match self.confirm_upload()? {
                Some(image) => Outcome::Uploaded {
                    size: image.data_url().len(),
                },
                None => Outcome::Unchanged,
            },
            Message::ClearImage => {
                self.clear_image()?;
                Outcome::Changed
            }
            Message::Export => {
                let (artifact, location) = self.export()?;
                Outcome::Exported {
                    location,
                    width: artifact.width,
                    height: artifact.height,
                }
            }
            overlay => Outcome::changed_if(self.handle_overlay(overlay)),
        };
        Ok(outcome)
    }

    /// Overlay messages; returns whether state changed.
    fn handle_overlay(&mut self, message: Message) -> bool {
        if !self.overlay_enabled() {
            log::debug!("Overlay inactive without an image, ignoring {:?}", message);
            return false;
        }
        match message {
            Message::AddText => {
                self.compositor.start_text_entry();
                true
            }
            Message::TextChanged(text) => self.compositor.set_text(text),
            Message::FontSizeChanged(size) => {
                self.compositor.set_font_size(size);
                true
            }
            Message::FontSizeInput(input) => self.compositor.set_font_size_input(&input),
            Message::FinishEditing => {
                self.compositor.finish_editing();
                true
            }
            Message::DragStarted { pointer, element } => {
                self.compositor.begin_drag(pointer, element);
                true
            }
            Message::DraggedOver { pointer, container } => {
                self.compositor.drag_over(pointer, container)
            }
            Message::DragEnded => {
                self.compositor.end_drag();
                true
            }
            other => {
                log::warn!("Not an overlay message: {:?}", other);
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Intake
    // ------------------------------------------------------------------

    /// Offer files for upload; see [`ImageIntake::select_files`].
    pub fn select_files(&mut self, files: Vec<SelectedFile>) -> usize {
        self.intake.select_files(files)
    }

    /// Drop the pending selection.
    pub fn cancel(&mut self) {
        self.intake.cancel();
    }

    /// Read and upload the first pending file.
    pub fn confirm_upload(&mut self) -> Result<Option<&UploadedImage>, IntakeError> {
        match self.intake.confirm_upload(self.storage.as_mut()) {
            Ok(image) => {
                self.last_error = None;
                Ok(image)
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// The file an asynchronous upload should read.
    pub fn begin_upload(&self) -> Option<&SelectedFile> {
        self.intake.begin_upload()
    }

    /// Finish an asynchronous upload with the file's bytes.
    pub fn complete_upload(&mut self, bytes: &[u8]) -> Result<&UploadedImage, IntakeError> {
        match self.intake.complete_upload(bytes, self.storage.as_mut()) {
            Ok(image) => {
                self.last_error = None;
                Ok(image)
            }
            Err(e) => {
                log::error!("Upload failed: {}", e);
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Record a failed asynchronous read. The selection stays pending.
    pub fn fail_upload(&mut self, error: IntakeError) {
        log::error!("{}", error);
        self.last_error = Some(error.to_string());
    }

    /// Remove the current image from the session and storage, and reset
    /// the annotation.
    pub fn clear_image(&mut self) -> Result<(), IntakeError> {
        self.intake.clear(self.storage.as_mut())?;
        self.compositor.reset();
        log::info!("Cleared uploaded image");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Compose the current image and annotation, without delivering it.
    pub fn compose(&self) -> Result<ExportArtifact, ExportError> {
        let image = self.intake.image().ok_or(ExportError::NoImage)?;
        self.compositor.export_image(image, self.backend.as_ref())
    }

    /// Compose and hand the result to the download sink.
    ///
    /// Returns the artifact and the sink's description of where it went.
    pub fn export(&mut self) -> Result<(ExportArtifact, String), ExportError> {
        let artifact = self.compose()?;
        let location = self.sink.deliver(&artifact)?;
        Ok((artifact, location))
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    /// The current image.
    pub fn image(&self) -> Option<&UploadedImage> {
        self.intake.image()
    }

    /// Files waiting for confirmation.
    pub fn pending(&self) -> &[SelectedFile] {
        self.intake.pending()
    }

    /// Current annotation.
    pub fn annotation(&self) -> &Annotation {
        self.compositor.annotation()
    }

    /// Check if a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.compositor.is_dragging()
    }

    /// Whether overlay and export controls are available.
    pub fn overlay_enabled(&self) -> bool {
        self.intake.image().is_some()
    }

    /// Overlay presentation, if the overlay is shown.
    pub fn overlay_style(&self) -> Option<OverlayStyle> {
        self.overlay_enabled().then(|| self.compositor.overlay_style())
    }

    /// The last upload error, cleared by the next successful upload.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::UPLOADED_IMAGE_KEY;
    use crate::data_url;
    use crate::export::MemorySink;
    use crate::intake::tests::{ReadOnlyStorage, png_bytes};
    use crate::model::{BoundingRect, Point, PointerEvent};
    use crate::storage::MemoryStorage;
    use crate::surface::{RecordingBackend, SurfaceOp};

    struct Harness {
        storage: MemoryStorage,
        backend: RecordingBackend,
        sink: MemorySink,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                storage: MemoryStorage::new(),
                backend: RecordingBackend::new(),
                sink: MemorySink::new(),
            }
        }

        fn editor(&self) -> Editor {
            Editor::new(
                Box::new(self.storage.clone()),
                Box::new(self.backend.clone()),
                Box::new(self.sink.clone()),
                "Arial",
            )
        }
    }

    fn png(name: &str, width: u32, height: u32) -> SelectedFile {
        SelectedFile::from_bytes(name, Some("image/png"), png_bytes(width, height))
    }

    fn upload(editor: &mut Editor, width: u32, height: u32) {
        editor
            .update(Message::FilesSelected(vec![png("img.png", width, height)]))
            .unwrap();
        let outcome = editor.update(Message::ConfirmUpload).unwrap();
        assert!(matches!(outcome, Outcome::Uploaded { .. }));
    }

    #[test]
    fn test_upload_survives_reload() {
        let harness = Harness::new();
        let bytes = png_bytes(6, 4);
        let mut editor = harness.editor();
        editor.select_files(vec![SelectedFile::from_bytes(
            "photo.png",
            Some("image/png"),
            bytes.clone(),
        )]);
        editor.confirm_upload().unwrap();

        let expected = data_url::encode("image/png", &bytes);
        assert_eq!(editor.image().unwrap().data_url(), expected);

        let reloaded = harness.editor();
        assert_eq!(reloaded.image().unwrap().data_url(), expected);
        assert_eq!(
            harness.storage.get(UPLOADED_IMAGE_KEY).unwrap().unwrap(),
            expected
        );
    }

    #[test]
    fn test_reload_resets_annotation() {
        let harness = Harness::new();
        let mut editor = harness.editor();
        upload(&mut editor, 8, 8);
        editor.update(Message::AddText).unwrap();
        editor.update(Message::FontSizeChanged(40)).unwrap();

        let reloaded = harness.editor();
        assert_eq!(reloaded.annotation(), &Annotation::default());
    }

    #[test]
    fn test_cancel_then_confirm_keeps_image() {
        let harness = Harness::new();
        let mut editor = harness.editor();
        upload(&mut editor, 2, 2);
        let before = editor.image().cloned();

        editor
            .update(Message::FilesSelected(vec![png("other.png", 9, 9)]))
            .unwrap();
        assert_eq!(
            editor.update(Message::CancelSelection).unwrap(),
            Outcome::Changed
        );
        assert_eq!(
            editor.update(Message::ConfirmUpload).unwrap(),
            Outcome::Unchanged
        );
        assert_eq!(editor.image().cloned(), before);
    }

    #[test]
    fn test_non_image_selection_changes_nothing() {
        let harness = Harness::new();
        let mut editor = harness.editor();

        let outcome = editor
            .update(Message::FilesSelected(vec![SelectedFile::from_bytes(
                "doc.pdf",
                Some("application/pdf"),
                b"%PDF".to_vec(),
            )]))
            .unwrap();

        assert_eq!(outcome, Outcome::Unchanged);
        assert!(editor.pending().is_empty());
        assert!(editor.image().is_none());
    }

    #[test]
    fn test_overlay_ignored_without_image() {
        let harness = Harness::new();
        let mut editor = harness.editor();

        assert_eq!(editor.update(Message::AddText).unwrap(), Outcome::Unchanged);
        assert!(editor.overlay_style().is_none());
        assert_eq!(editor.annotation().text, "");
    }

    #[test]
    fn test_export_without_image_fails() {
        let harness = Harness::new();
        let mut editor = harness.editor();
        assert!(matches!(
            editor.update(Message::Export),
            Err(EditorError::Export(ExportError::NoImage))
        ));
        assert!(harness.sink.delivered().is_empty());
    }

    #[test]
    fn test_full_session_exports_positioned_text() {
        let harness = Harness::new();
        let mut editor = harness.editor();
        upload(&mut editor, 120, 90);

        editor.update(Message::AddText).unwrap();
        editor
            .update(Message::TextChanged("Hi".to_string()))
            .unwrap();
        editor
            .update(Message::FontSizeInput("20".to_string()))
            .unwrap();
        editor.update(Message::FinishEditing).unwrap();

        let container = BoundingRect::new(300.0, 200.0, 120.0, 90.0);
        editor
            .update(Message::DragStarted {
                pointer: PointerEvent::new(305.0, 204.0),
                element: BoundingRect::new(300.0, 200.0, 30.0, 20.0),
            })
            .unwrap();
        for (x, y) in [(305.0, 210.0), (308.0, 222.0), (310.0, 230.0)] {
            editor
                .update(Message::DraggedOver {
                    pointer: PointerEvent::new(x, y),
                    container,
                })
                .unwrap();
        }
        editor.update(Message::DragEnded).unwrap();
        assert_eq!(editor.annotation().position, Point::new(10.0, 30.0));

        let outcome = editor.update(Message::Export).unwrap();

        assert_eq!(
            outcome,
            Outcome::Exported {
                location: "memory:result_image.png".to_string(),
                width: 120,
                height: 90,
            }
        );
        assert_eq!(
            harness.backend.last_fill_text(),
            Some(SurfaceOp::FillText {
                text: "Hi".to_string(),
                x: 10.0,
                y: 50.0
            })
        );
        let delivered = harness.sink.last().unwrap();
        let decoded = image::load_from_memory(&delivered.png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 90));
    }

    #[test]
    fn test_failed_upload_records_error() {
        let harness = Harness::new();
        let mut editor = harness.editor();
        editor.select_files(vec![SelectedFile::from_path("/no/such/file.png")]);

        assert!(editor.update(Message::ConfirmUpload).is_err());
        assert!(editor.last_error().unwrap().contains("file.png"));
        assert_eq!(editor.pending().len(), 1);
    }

    #[test]
    fn test_storage_failure_records_error() {
        let harness = Harness::new();
        upload(&mut harness.editor(), 2, 2);
        let mut editor = Editor::new(
            Box::new(ReadOnlyStorage(harness.storage.clone())),
            Box::new(harness.backend.clone()),
            Box::new(harness.sink.clone()),
            "Arial",
        );
        let before = editor.image().cloned();
        assert!(before.is_some());

        editor.select_files(vec![png("b.png", 4, 4)]);
        let result = editor.update(Message::ConfirmUpload);

        assert!(matches!(result, Err(EditorError::Intake(IntakeError::Storage(_)))));
        assert!(editor.last_error().is_some());
        assert_eq!(editor.image().cloned(), before);
        assert_eq!(editor.pending().len(), 1);
    }

    #[test]
    fn test_async_upload_split() {
        let harness = Harness::new();
        let mut editor = harness.editor();
        editor.select_files(vec![png("a.png", 3, 3)]);

        let name = editor.begin_upload().unwrap().name.clone();
        assert_eq!(name, "a.png");
        assert!(editor.image().is_none());

        editor.complete_upload(&png_bytes(3, 3)).unwrap();
        assert!(editor.image().is_some());
        assert!(editor.pending().is_empty());
    }

    #[test]
    fn test_clear_image_resets_session() {
        let harness = Harness::new();
        let mut editor = harness.editor();
        upload(&mut editor, 2, 2);
        editor.update(Message::AddText).unwrap();

        editor.update(Message::ClearImage).unwrap();

        assert!(editor.image().is_none());
        assert_eq!(editor.annotation(), &Annotation::default());
        assert!(harness.editor().image().is_none());
    }
}
