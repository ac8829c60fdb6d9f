//! Global constants for the captioner application

/// Storage key under which the uploaded image's data URL is persisted.
pub const UPLOADED_IMAGE_KEY: &str = "uploadedImage";

/// File name offered for the exported composite.
pub const EXPORT_FILE_NAME: &str = "result_image.png";

/// Font size of a fresh annotation, in pixels.
pub const DEFAULT_FONT_SIZE_PX: i32 = 16;

/// Text placed in the annotation when text entry starts.
pub const PLACEHOLDER_TEXT: &str = "Click to edit";

/// Font family used when the configuration does not name one.
pub const DEFAULT_FONT_FAMILY: &str = "Arial";

/// Value of the file input's `accept` attribute.
pub const ACCEPT_ATTRIBUTE: &str = "image/png, image/jpeg";
