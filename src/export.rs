//! Export artifacts and their delivery to the user.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;

use crate::intake::ImageDecodeError;
use crate::surface::SurfaceError;

/// Errors that can occur while exporting the composite.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Export requested with no uploaded image
    #[error("No image has been uploaded")]
    NoImage,

    /// The uploaded image could not be decoded
    #[error(transparent)]
    Decode(#[from] ImageDecodeError),

    /// Composing or encoding failed
    #[error("Compositing failed: {0}")]
    Surface(#[from] SurfaceError),

    /// Writing the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The platform download could not be triggered
    #[error("Download failed: {0}")]
    Delivery(String),
}

/// An encoded composite ready for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Suggested download name
    pub file_name: String,
    /// PNG bytes
    pub png: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ExportArtifact {
    /// The PNG as a data URL, for anchors and previews.
    pub fn data_url(&self) -> String {
        crate::data_url::encode("image/png", &self.png)
    }
}

/// Hands an exported file to the user.
pub trait DownloadSink {
    /// Deliver the artifact, returning a human-readable location.
    fn deliver(&mut self, artifact: &ExportArtifact) -> Result<String, ExportError>;
}

/// Writes exports into a directory, overwriting a previous export.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&mut self, artifact: &ExportArtifact) -> Result<String, ExportError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&artifact.file_name);
        std::fs::write(&path, &artifact.png)?;
        log::info!(
            "💾 Wrote {}x{} export to {:?}",
            artifact.width,
            artifact.height,
            path
        );
        Ok(path.display().to_string())
    }
}

/// Keeps delivered artifacts in memory. Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    delivered: Rc<RefCell<Vec<ExportArtifact>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, oldest first.
    pub fn delivered(&self) -> Vec<ExportArtifact> {
        self.delivered.borrow().clone()
    }

    /// The most recent delivery.
    pub fn last(&self) -> Option<ExportArtifact> {
        self.delivered.borrow().last().cloned()
    }
}

impl DownloadSink for MemorySink {
    fn deliver(&mut self, artifact: &ExportArtifact) -> Result<String, ExportError> {
        self.delivered.borrow_mut().push(artifact.clone());
        Ok(format!("memory:{}", artifact.file_name))
    }
}
