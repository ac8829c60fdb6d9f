//! captioner - add a draggable text caption to an image and export it as PNG
//!
//! The editor uploads one PNG or JPEG image, persists it as a data URL so it
//! survives reloads, lets the user place a single text annotation over it,
//! and composes image plus text into `result_image.png` at the image's
//! natural size. It runs in the browser (WASM, `<canvas>` compositing) and
//! natively (software rasterizer, command line front-end).

pub mod compositor;
pub mod config;
pub mod constants;
pub mod data_url;
pub mod editor;
pub mod error;
pub mod export;
pub mod intake;
pub mod message;
pub mod model;
pub mod storage;
pub mod surface;

#[cfg(not(target_arch = "wasm32"))]
pub mod session;

pub use compositor::{Cursor, OverlayCompositor, OverlayStyle};
pub use config::{AppConfig, ConfigError, LogLevel};
pub use editor::Editor;
pub use error::EditorError;
pub use export::{DirectorySink, DownloadSink, ExportArtifact, ExportError, MemorySink};
pub use intake::{ImageIntake, IntakeError, SelectedFile, UploadedImage};
pub use message::{Message, Outcome};
pub use storage::{FileStorage, MemoryStorage, StorageError, StoragePort};

// WASM entry point
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;
