//! Browser front-end.
//!
//! [`WebEditor`] exposes the editor to JavaScript. The page owns the DOM
//! (file input, image, overlay text, buttons) and forwards its events here;
//! state lives in Rust and is read back through getters after each call.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, Event, FileList, FileReader, HtmlAnchorElement};

use crate::config::AppConfig;
use crate::constants::ACCEPT_ATTRIBUTE;
use crate::editor::Editor;
use crate::export::{DownloadSink, ExportArtifact, ExportError};
use crate::intake::{FileSource, IntakeError, SelectedFile};
use crate::message::{Message, Outcome};
use crate::model::{BoundingRect, PointerEvent};
use crate::storage::{StorageError, StoragePort};
use crate::surface::CanvasBackend;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    let config = AppConfig::load_from_local_storage().unwrap_or_default();
    let level = config
        .preferences
        .log_level
        .to_level_filter()
        .to_level()
        .unwrap_or(log::Level::Error);
    if let Err(e) = console_log::init_with_level(level) {
        web_sys::console::log_1(&format!("Logger already initialised: {}", e).into());
    }
    log::info!("captioner WASM starting");
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn document() -> Result<Document, JsValue> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("No document available"))
}

/// `window.localStorage` as a [`StoragePort`].
struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    fn open() -> Result<Self, StorageError> {
        let storage = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("No window object available".to_string()))?
            .local_storage()
            .map_err(|e| StorageError::Unavailable(format!("localStorage access error: {:?}", e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage not available".to_string()))?;
        Ok(Self { storage })
    }
}

impl StoragePort for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.storage
            .remove_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }
}

/// Triggers a browser download through a temporary `<a download>`.
struct AnchorSink {
    document: Document,
}

impl DownloadSink for AnchorSink {
    fn deliver(&mut self, artifact: &ExportArtifact) -> Result<String, ExportError> {
        let delivery = |e: JsValue| ExportError::Delivery(format!("{:?}", e));

        let anchor: HtmlAnchorElement = self
            .document
            .create_element("a")
            .map_err(delivery)?
            .dyn_into()
            .map_err(|_| ExportError::Delivery("not an anchor element".to_string()))?;
        anchor.set_href(&artifact.data_url());
        anchor.set_download(&artifact.file_name);

        let body = self
            .document
            .body()
            .ok_or_else(|| ExportError::Delivery("document has no body".to_string()))?;
        body.append_child(&anchor).map_err(delivery)?;
        anchor.click();
        anchor.remove();

        log::info!("💾 Download of {} triggered", artifact.file_name);
        Ok(artifact.file_name.clone())
    }
}

fn rect_of(element: &Element) -> BoundingRect {
    let rect = element.get_bounding_client_rect();
    BoundingRect::new(
        rect.left() as f32,
        rect.top() as f32,
        rect.width() as f32,
        rect.height() as f32,
    )
}

/// A `FileReader` in flight and the callbacks it holds.
///
/// Dropping it detaches the callbacks and aborts an unfinished read.
struct PendingRead {
    reader: FileReader,
    _onload: Closure<dyn FnMut(Event)>,
    _onerror: Closure<dyn FnMut(Event)>,
}

impl Drop for PendingRead {
    fn drop(&mut self) {
        self.reader.set_onload(None);
        self.reader.set_onerror(None);
        self.reader.abort();
    }
}

/// The editor as seen from JavaScript.
#[wasm_bindgen]
pub struct WebEditor {
    inner: Rc<RefCell<Editor>>,
    read: RefCell<Option<PendingRead>>,
}

#[wasm_bindgen]
impl WebEditor {
    /// Create an editor backed by localStorage, restoring a stored image.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WebEditor, JsValue> {
        let config = AppConfig::load_from_local_storage().unwrap_or_default();
        let document = document()?;

        let storage = LocalStorage::open().map_err(to_js)?;
        let backend = CanvasBackend::new(config.preferences.text_color).map_err(to_js)?;
        let sink = AnchorSink { document };

        let editor = Editor::new(
            Box::new(storage),
            Box::new(backend),
            Box::new(sink),
            &config.preferences.font_family,
        );
        Ok(Self {
            inner: Rc::new(RefCell::new(editor)),
            read: RefCell::new(None),
        })
    }

    /// Value for the file input's `accept` attribute.
    pub fn accept() -> String {
        ACCEPT_ATTRIBUTE.to_string()
    }

    /// Offer the input's files. Returns how many passed the type filter.
    pub fn select_files(&self, files: &FileList) -> usize {
        let selected: Vec<SelectedFile> = (0..files.length())
            .filter_map(|i| files.get(i))
            .map(|file| SelectedFile {
                name: file.name(),
                mime: Some(file.type_()),
                source: FileSource::Web(file),
            })
            .collect();
        self.inner.borrow_mut().select_files(selected)
    }

    /// Discard the pending selection.
    pub fn cancel(&self) {
        self.inner.borrow_mut().cancel();
    }

    /// Upload the first pending file.
    ///
    /// Browser files are read asynchronously; `on_done` is called once the
    /// read finishes, successfully or not. Check `last_error` afterwards.
    /// Starting another upload abandons a read still in progress.
    pub fn upload(&self, on_done: Option<js_sys::Function>) -> Result<(), JsValue> {
        let next = self.inner.borrow().begin_upload().cloned();
        let Some(file) = next else {
            log::debug!("Upload requested with nothing selected");
            return Ok(());
        };

        let FileSource::Web(web_file) = file.source else {
            let result = self.inner.borrow_mut().confirm_upload().map(|_| ());
            notify(on_done.as_ref());
            return result.map_err(to_js);
        };

        let reader = FileReader::new()?;
        let name = file.name;
        log::info!("📂 Reading file: {}", name);

        let editor = Rc::clone(&self.inner);
        let done = on_done.clone();
        let load_name = name.clone();
        let onload = Closure::wrap(Box::new(move |event: Event| {
            let bytes = event
                .target()
                .and_then(|t| t.dyn_into::<FileReader>().ok())
                .and_then(|reader| reader.result().ok())
                .map(|result| js_sys::Uint8Array::new(&result).to_vec());

            let mut editor = editor.borrow_mut();
            match bytes {
                Some(bytes) => {
                    // Errors are recorded on the editor
                    let _ = editor.complete_upload(&bytes);
                }
                None => editor.fail_upload(IntakeError::Read {
                    name: load_name.clone(),
                    source: std::io::Error::other("reader returned no data"),
                }),
            }
            drop(editor);
            notify(done.as_ref());
        }) as Box<dyn FnMut(Event)>);

        let editor = Rc::clone(&self.inner);
        let onerror = Closure::wrap(Box::new(move |event: Event| {
            let detail = event
                .target()
                .and_then(|t| t.dyn_into::<FileReader>().ok())
                .and_then(|reader| reader.error())
                .map(|e| e.message())
                .unwrap_or_else(|| "unknown error".to_string());
            editor.borrow_mut().fail_upload(IntakeError::Read {
                name: name.clone(),
                source: std::io::Error::other(detail),
            });
            notify(on_done.as_ref());
        }) as Box<dyn FnMut(Event)>);

        reader.set_onload(Some(onload.as_ref().unchecked_ref()));
        reader.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        reader.read_as_array_buffer(&web_file)?;

        // Replacing the previous read drops its callbacks
        *self.read.borrow_mut() = Some(PendingRead {
            reader,
            _onload: onload,
            _onerror: onerror,
        });
        Ok(())
    }

    /// Forget the current image.
    pub fn clear_image(&self) -> Result<(), JsValue> {
        self.inner.borrow_mut().clear_image().map_err(to_js)
    }

    /// "Add Text" pressed.
    pub fn add_text(&self) -> bool {
        self.apply(Message::AddText)
    }

    /// Text input changed.
    pub fn set_text(&self, text: String) -> bool {
        self.apply(Message::TextChanged(text))
    }

    /// Font size input changed.
    pub fn set_font_size(&self, value: String) -> bool {
        self.apply(Message::FontSizeInput(value))
    }

    /// Text input lost focus or Enter was pressed.
    pub fn finish_editing(&self) -> bool {
        self.apply(Message::FinishEditing)
    }

    /// `dragstart` on the text label.
    pub fn drag_start(&self, client_x: f32, client_y: f32, element: &Element) -> bool {
        self.apply(Message::DragStarted {
            pointer: PointerEvent::new(client_x, client_y),
            element: rect_of(element),
        })
    }

    /// `dragover` on the image container.
    pub fn drag_over(&self, client_x: f32, client_y: f32, container: &Element) -> bool {
        self.apply(Message::DraggedOver {
            pointer: PointerEvent::new(client_x, client_y),
            container: rect_of(container),
        })
    }

    /// `dragend` on the text label.
    pub fn drag_end(&self) -> bool {
        self.apply(Message::DragEnded)
    }

    /// Compose and download the result. Returns the downloaded file name.
    pub fn export(&self) -> Result<String, JsValue> {
        let (_, location) = self.inner.borrow_mut().export().map_err(to_js)?;
        Ok(location)
    }

    /// Whether an image is loaded; overlay and export controls depend on it.
    pub fn has_image(&self) -> bool {
        self.inner.borrow().overlay_enabled()
    }

    /// `src` for the displayed image.
    pub fn image_src(&self) -> Option<String> {
        self.inner
            .borrow()
            .image()
            .map(|image| image.data_url().to_string())
    }

    /// Number of files waiting for confirmation.
    pub fn pending_count(&self) -> usize {
        self.inner.borrow().pending().len()
    }

    /// Current annotation text.
    pub fn text(&self) -> String {
        self.inner.borrow().annotation().text.clone()
    }

    /// Current font size in pixels.
    pub fn font_size(&self) -> i32 {
        self.inner.borrow().annotation().font_size_px
    }

    /// Whether the text is shown as an input.
    pub fn editing(&self) -> bool {
        self.inner.borrow().annotation().editing
    }

    /// Inline style for the overlay label, or `None` when hidden.
    pub fn overlay_css(&self) -> Option<String> {
        self.inner.borrow().overlay_style().map(|s| s.to_css())
    }

    /// The last upload error.
    pub fn last_error(&self) -> Option<String> {
        self.inner.borrow().last_error().map(str::to_string)
    }
}

impl WebEditor {
    fn apply(&self, message: Message) -> bool {
        match self.inner.borrow_mut().update(message) {
            Ok(outcome) => outcome != Outcome::Unchanged,
            Err(e) => {
                log::error!("{}", e);
                false
            }
        }
    }
}

fn notify(callback: Option<&js_sys::Function>) {
    let Some(callback) = callback else {
        return;
    };
    if let Err(e) = callback.call0(&JsValue::NULL) {
        log::warn!("Upload callback failed: {:?}", e);
    }
}
