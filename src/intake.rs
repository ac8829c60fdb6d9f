//! Image intake: file selection, upload and persistence.
//!
//! Selected files wait in a pending selection until the user confirms. On
//! confirmation the first file is read, encoded as a data URL, written to
//! storage under [`UPLOADED_IMAGE_KEY`] and becomes the current image.
//! Browser reads complete asynchronously, so the upload is split into
//! [`ImageIntake::begin_upload`] and [`ImageIntake::complete_upload`].

use std::path::{Path, PathBuf};

use image::RgbaImage;
use thiserror::Error;

use crate::constants::UPLOADED_IMAGE_KEY;
use crate::data_url::{self, DataUrl, DataUrlError, ImageMime};
use crate::storage::{StorageError, StoragePort};

/// Errors raised while uploading an image.
#[derive(Error, Debug)]
pub enum IntakeError {
    /// Reading the selected file failed
    #[error("Failed to read '{name}': {source}")]
    Read {
        /// Name of the file being read
        name: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file can only be read through the browser's asynchronous reader
    #[error("'{name}' must be read asynchronously")]
    AsyncOnly {
        /// Name of the file
        name: String,
    },

    /// Content is not a PNG or JPEG image
    #[error("'{name}' is not a PNG or JPEG image")]
    UnsupportedFormat {
        /// Name of the file
        name: String,
    },

    /// Persisting the image failed
    #[error("Failed to persist image: {0}")]
    Storage(#[from] StorageError),
}

/// Errors raised while decoding the uploaded image to pixels.
#[derive(Error, Debug)]
pub enum ImageDecodeError {
    /// The stored data URL is malformed
    #[error("Invalid image data URL: {0}")]
    DataUrl(#[from] DataUrlError),

    /// The payload is not a decodable image
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Where a selected file's bytes come from.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// A file on the local filesystem
    Path(PathBuf),
    /// Bytes already in memory (dropped data, tests)
    Bytes(Vec<u8>),
    /// A browser `File`, readable only through `FileReader`
    #[cfg(target_arch = "wasm32")]
    Web(web_sys::File),
}

/// A file chosen or dropped by the user.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    /// Display name, usually the file name
    pub name: String,
    /// Declared media type, if the source provides one
    pub mime: Option<String>,
    /// Content source
    pub source: FileSource,
}

impl SelectedFile {
    /// Select a file on disk; the media type is guessed from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime = ImageMime::from_file_name(&name).map(|m| m.as_str().to_string());
        Self {
            name,
            mime,
            source: FileSource::Path(path.to_path_buf()),
        }
    }

    /// Select in-memory bytes.
    pub fn from_bytes(name: impl Into<String>, mime: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.map(str::to_string),
            source: FileSource::Bytes(bytes),
        }
    }

    /// Read the whole file synchronously.
    pub fn read(&self) -> Result<Vec<u8>, IntakeError> {
        match &self.source {
            FileSource::Path(path) => std::fs::read(path).map_err(|source| IntakeError::Read {
                name: self.name.clone(),
                source,
            }),
            FileSource::Bytes(bytes) => Ok(bytes.clone()),
            #[cfg(target_arch = "wasm32")]
            FileSource::Web(_) => Err(IntakeError::AsyncOnly {
                name: self.name.clone(),
            }),
        }
    }
}

/// The file input's type filter: PNG and JPEG only.
///
/// A file passes if its declared media type is accepted, or, when no type
/// is declared, if its extension is.
pub fn accepts(file: &SelectedFile) -> bool {
    match file.mime.as_deref().filter(|m| !m.is_empty()) {
        Some(mime) => ImageMime::from_mime(mime).is_some(),
        None => ImageMime::from_file_name(&file.name).is_some(),
    }
}

/// The current image, held as a data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    data_url: String,
    mime: ImageMime,
}

impl UploadedImage {
    /// Encode raw file bytes. The format is detected from magic bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let mime = ImageMime::sniff(bytes)?;
        Some(Self {
            data_url: data_url::encode(mime.as_str(), bytes),
            mime,
        })
    }

    /// Wrap a stored data URL after checking it declares an accepted type.
    pub fn from_data_url(url: impl Into<String>) -> Result<Self, DataUrlError> {
        let url = url.into();
        let mime = DataUrl::parse(&url)?.image_mime()?;
        Ok(Self {
            data_url: url,
            mime,
        })
    }

    /// The data URL string.
    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    /// The image format.
    pub fn mime(&self) -> ImageMime {
        self.mime
    }

    /// The encoded file bytes.
    pub fn bytes(&self) -> Result<Vec<u8>, DataUrlError> {
        Ok(DataUrl::parse(&self.data_url)?.into_data())
    }

    /// Decode to an RGBA bitmap at natural size.
    pub fn decode(&self) -> Result<RgbaImage, ImageDecodeError> {
        let bytes = self.bytes()?;
        let image = image::load_from_memory_with_format(&bytes, self.mime.image_format())?;
        Ok(image.to_rgba8())
    }

    /// Natural pixel dimensions.
    pub fn dimensions(&self) -> Result<(u32, u32), ImageDecodeError> {
        Ok(self.decode()?.dimensions())
    }
}

/// Pending selection plus the current uploaded image.
#[derive(Debug, Default)]
pub struct ImageIntake {
    pending: Vec<SelectedFile>,
    image: Option<UploadedImage>,
}

impl ImageIntake {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session, loading a previously stored image if there is one.
    ///
    /// An unreadable or malformed stored value is logged and ignored.
    pub fn restore(storage: &dyn StoragePort) -> Self {
        let image = match storage.get(UPLOADED_IMAGE_KEY) {
            Ok(Some(url)) => match UploadedImage::from_data_url(url) {
                Ok(image) => {
                    log::info!("Restored stored {} image", image.mime().as_str());
                    Some(image)
                }
                Err(e) => {
                    log::warn!("Ignoring stored image: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::warn!("Failed to read stored image: {}", e);
                None
            }
        };
        Self {
            pending: Vec::new(),
            image,
        }
    }

    /// Replace the pending selection with the files that pass [`accepts`].
    ///
    /// Returns how many files were kept. When none pass, the previous
    /// selection is left untouched.
    pub fn select_files(&mut self, files: Vec<SelectedFile>) -> usize {
        let total = files.len();
        let accepted: Vec<SelectedFile> = files.into_iter().filter(accepts).collect();
        if accepted.is_empty() {
            log::debug!("Rejected selection of {} file(s): no PNG or JPEG", total);
            return 0;
        }
        if accepted.len() < total {
            log::debug!("Filtered {} non-image file(s)", total - accepted.len());
        }
        log::debug!("📂 {} file(s) pending upload", accepted.len());
        self.pending = accepted;
        self.pending.len()
    }

    /// Files waiting for confirmation.
    pub fn pending(&self) -> &[SelectedFile] {
        &self.pending
    }

    /// Check if there is a selection to upload.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drop the pending selection.
    pub fn cancel(&mut self) {
        if !self.pending.is_empty() {
            log::debug!("Cancelled selection of {} file(s)", self.pending.len());
        }
        self.pending.clear();
    }

    /// The file an upload would read, without changing any state.
    pub fn begin_upload(&self) -> Option<&SelectedFile> {
        self.pending.first()
    }

    /// Finish an upload with the first file's bytes.
    ///
    /// The image is persisted before it replaces the current one, so a
    /// storage failure leaves both the image and the selection unchanged.
    pub fn complete_upload(
        &mut self,
        bytes: &[u8],
        storage: &mut dyn StoragePort,
    ) -> Result<&UploadedImage, IntakeError> {
        let name = self
            .pending
            .first()
            .map(|f| f.name.clone())
            .unwrap_or_else(|| "<unnamed>".to_string());

        let image = UploadedImage::from_bytes(bytes).ok_or_else(|| {
            IntakeError::UnsupportedFormat {
                name: name.clone(),
            }
        })?;
        storage.set(UPLOADED_IMAGE_KEY, image.data_url())?;

        log::info!(
            "📂 Uploaded '{}' ({} bytes, {})",
            name,
            bytes.len(),
            image.mime().as_str()
        );
        self.pending.clear();
        Ok(&*self.image.insert(image))
    }

    /// Read the first pending file and upload it.
    ///
    /// Without a pending selection this is a no-op returning `Ok(None)`. A
    /// failed read keeps the selection so the user can retry.
    pub fn confirm_upload(
        &mut self,
        storage: &mut dyn StoragePort,
    ) -> Result<Option<&UploadedImage>, IntakeError> {
        let Some(file) = self.pending.first() else {
            log::debug!("Upload requested with nothing selected");
            return Ok(None);
        };

        let bytes = file.read().inspect_err(|e| log::error!("{}", e))?;
        self.complete_upload(&bytes, storage).map(Some)
    }

    /// The current image.
    pub fn image(&self) -> Option<&UploadedImage> {
        self.image.as_ref()
    }

    /// Forget the current image and its stored copy.
    pub fn clear(&mut self, storage: &mut dyn StoragePort) -> Result<(), IntakeError> {
        storage.remove(UPLOADED_IMAGE_KEY)?;
        self.image = None;
        self.pending.clear();
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use std::io::Cursor;

    /// Encode a solid-colour PNG of the given size.
    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, image::Rgba([40, 80, 120, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    /// Storage that reads through to a shared map but refuses writes.
    pub(crate) struct ReadOnlyStorage(pub(crate) MemoryStorage);

    impl StoragePort for ReadOnlyStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key)
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }

        fn remove(&mut self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }
    }

    fn png_file(name: &str, width: u32, height: u32) -> SelectedFile {
        SelectedFile::from_bytes(name, Some("image/png"), png_bytes(width, height))
    }

    #[test]
    fn test_filter_accepts_png_and_jpeg() {
        assert!(accepts(&SelectedFile::from_bytes("a.png", Some("image/png"), vec![])));
        assert!(accepts(&SelectedFile::from_bytes("a", Some("image/jpeg"), vec![])));
        assert!(accepts(&SelectedFile::from_bytes("a.JPEG", None, vec![])));
        assert!(accepts(&SelectedFile::from_path("/tmp/photo.jpg")));
    }

    #[test]
    fn test_filter_rejects_other_types() {
        assert!(!accepts(&SelectedFile::from_bytes("a.txt", Some("text/plain"), vec![])));
        assert!(!accepts(&SelectedFile::from_bytes("a.gif", Some("image/gif"), vec![])));
        // Declared type wins over a misleading extension.
        assert!(!accepts(&SelectedFile::from_bytes("a.png", Some("application/pdf"), vec![])));
        assert!(!accepts(&SelectedFile::from_bytes("README", None, vec![])));
    }

    #[test]
    fn test_rejected_selection_changes_nothing() {
        let mut intake = ImageIntake::new();
        intake.select_files(vec![png_file("keep.png", 2, 2)]);

        let kept = intake.select_files(vec![SelectedFile::from_bytes(
            "notes.txt",
            Some("text/plain"),
            b"hello".to_vec(),
        )]);

        assert_eq!(kept, 0);
        assert_eq!(intake.pending().len(), 1);
        assert_eq!(intake.pending()[0].name, "keep.png");
    }

    #[test]
    fn test_mixed_selection_keeps_images_only() {
        let mut intake = ImageIntake::new();
        let kept = intake.select_files(vec![
            SelectedFile::from_bytes("notes.txt", Some("text/plain"), vec![]),
            png_file("a.png", 1, 1),
        ]);
        assert_eq!(kept, 1);
        assert_eq!(intake.begin_upload().unwrap().name, "a.png");
    }

    #[test]
    fn test_confirm_uploads_first_file_as_data_url() {
        let mut storage = MemoryStorage::new();
        let mut intake = ImageIntake::new();
        let first = png_bytes(3, 2);
        intake.select_files(vec![
            SelectedFile::from_bytes("first.png", Some("image/png"), first.clone()),
            png_file("second.png", 5, 5),
        ]);

        let image = intake.confirm_upload(&mut storage).unwrap().unwrap().clone();

        assert_eq!(image.data_url(), data_url::encode("image/png", &first));
        assert_eq!(image.dimensions().unwrap(), (3, 2));
        assert!(!intake.has_pending());
        assert_eq!(
            storage.get(UPLOADED_IMAGE_KEY).unwrap().as_deref(),
            Some(image.data_url())
        );
    }

    #[test]
    fn test_confirm_without_selection_is_noop() {
        let mut storage = MemoryStorage::new();
        let mut intake = ImageIntake::new();
        assert!(intake.confirm_upload(&mut storage).unwrap().is_none());
        assert!(intake.image().is_none());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_cancel_then_confirm_keeps_image() {
        let mut storage = MemoryStorage::new();
        let mut intake = ImageIntake::new();
        intake.select_files(vec![png_file("a.png", 2, 2)]);
        intake.confirm_upload(&mut storage).unwrap();
        let before = intake.image().cloned();

        intake.select_files(vec![png_file("b.png", 4, 4)]);
        intake.cancel();
        assert!(intake.confirm_upload(&mut storage).unwrap().is_none());

        assert_eq!(intake.image().cloned(), before);
    }

    #[test]
    fn test_restore_after_reload() {
        let mut storage = MemoryStorage::new();
        let mut intake = ImageIntake::new();
        intake.select_files(vec![png_file("a.png", 2, 2)]);
        intake.confirm_upload(&mut storage).unwrap();

        let reloaded = ImageIntake::restore(&storage);
        assert_eq!(reloaded.image(), intake.image());
        assert!(!reloaded.has_pending());
    }

    #[test]
    fn test_restore_ignores_corrupt_value() {
        let mut storage = MemoryStorage::new();
        storage.set(UPLOADED_IMAGE_KEY, "garbage").unwrap();
        assert!(ImageIntake::restore(&storage).image().is_none());
    }

    #[test]
    fn test_read_failure_keeps_selection() {
        let mut storage = MemoryStorage::new();
        let mut intake = ImageIntake::new();
        intake.select_files(vec![SelectedFile::from_path("/no/such/dir/missing.png")]);

        let result = intake.confirm_upload(&mut storage);

        assert!(matches!(result, Err(IntakeError::Read { .. })));
        assert!(intake.has_pending());
        assert!(intake.image().is_none());
    }

    #[test]
    fn test_non_image_content_is_rejected() {
        let mut storage = MemoryStorage::new();
        let mut intake = ImageIntake::new();
        intake.select_files(vec![SelectedFile::from_bytes(
            "fake.png",
            Some("image/png"),
            b"plain text".to_vec(),
        )]);

        let result = intake.confirm_upload(&mut storage);

        assert!(matches!(result, Err(IntakeError::UnsupportedFormat { name }) if name == "fake.png"));
        assert!(intake.has_pending());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_storage_failure_keeps_image_and_selection() {
        let mut storage = MemoryStorage::new();
        let mut intake = ImageIntake::new();
        intake.select_files(vec![png_file("a.png", 2, 2)]);
        intake.confirm_upload(&mut storage).unwrap();
        let before = intake.image().cloned();

        let mut full = ReadOnlyStorage(storage.clone());
        intake.select_files(vec![png_file("b.png", 4, 4)]);
        let result = intake.confirm_upload(&mut full);

        assert!(matches!(result, Err(IntakeError::Storage(_))));
        assert_eq!(intake.image().cloned(), before);
        assert!(intake.has_pending());
        assert_eq!(intake.pending()[0].name, "b.png");
        assert_eq!(
            storage.get(UPLOADED_IMAGE_KEY).unwrap().as_deref(),
            before.as_ref().map(UploadedImage::data_url)
        );
    }

    #[test]
    fn test_clear_removes_stored_image() {
        let mut storage = MemoryStorage::new();
        let mut intake = ImageIntake::new();
        intake.select_files(vec![png_file("a.png", 1, 1)]);
        intake.confirm_upload(&mut storage).unwrap();

        intake.clear(&mut storage).unwrap();

        assert!(intake.image().is_none());
        assert!(storage.get(UPLOADED_IMAGE_KEY).unwrap().is_none());
    }
}
