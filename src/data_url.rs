//! Data URL encoding for uploaded images.
//!
//! An uploaded image is held as `data:<mime>;base64,<payload>`, the same
//! string a browser `FileReader.readAsDataURL` produces. Only PNG and JPEG
//! payloads are accepted.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

/// PNG signature: 89 50 4E 47 0D 0A 1A 0A
const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// JPEG SOI marker followed by the first segment marker: FF D8 FF
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Errors produced while parsing a data URL.
#[derive(Error, Debug)]
pub enum DataUrlError {
    /// The string does not start with `data:`
    #[error("not a data URL")]
    MissingScheme,

    /// No comma separating the header from the payload
    #[error("data URL has no payload separator")]
    MissingPayload,

    /// Only base64 payloads are produced and accepted
    #[error("data URL payload is not base64 encoded")]
    NotBase64,

    /// The declared media type is not an accepted image type
    #[error("unsupported media type '{0}'")]
    UnsupportedMime(String),

    /// Payload failed to decode
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Image formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    /// Portable Network Graphics
    Png,
    /// JPEG / JFIF
    Jpeg,
}

impl ImageMime {
    /// The IANA media type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Png => "image/png",
            ImageMime::Jpeg => "image/jpeg",
        }
    }

    /// File extensions (lowercase, no dot) this format is known by.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            ImageMime::Png => &["png"],
            ImageMime::Jpeg => &["jpg", "jpeg"],
        }
    }

    /// All accepted formats.
    pub fn all() -> &'static [ImageMime] {
        &[ImageMime::Png, ImageMime::Jpeg]
    }

    /// Parse a media type string, ignoring case and parameters.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Some(ImageMime::Png),
            // image/jpg is non-standard but common in the wild
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageMime::Jpeg),
            _ => None,
        }
    }

    /// Guess the format from a file name's extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|mime| mime.extensions().contains(&ext.as_str()))
    }

    /// Detect the format from leading magic bytes.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(&PNG_MAGIC) {
            Some(ImageMime::Png)
        } else if data.starts_with(&JPEG_MAGIC) {
            Some(ImageMime::Jpeg)
        } else {
            None
        }
    }

    /// The matching `image` crate format.
    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            ImageMime::Png => image::ImageFormat::Png,
            ImageMime::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

/// Encode bytes as a base64 data URL with the given media type.
pub fn encode(mime: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(data))
}

/// A parsed data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    mime: String,
    data: Vec<u8>,
}

impl DataUrl {
    /// Parse a `data:<mime>;base64,<payload>` string.
    pub fn parse(url: &str) -> Result<Self, DataUrlError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or(DataUrlError::MissingScheme)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUrlError::MissingPayload)?;

        let mut parts = header.split(';');
        let mime = parts.next().unwrap_or_default().trim().to_string();
        if !parts.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
            return Err(DataUrlError::NotBase64);
        }

        let data = STANDARD.decode(payload.trim())?;
        Ok(Self { mime, data })
    }

    /// The declared media type (may be empty).
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// The decoded payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume and return the payload.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// The accepted image format this URL declares.
    pub fn image_mime(&self) -> Result<ImageMime, DataUrlError> {
        ImageMime::from_mime(&self.mime)
            .ok_or_else(|| DataUrlError::UnsupportedMime(self.mime.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_matches_reader_output() {
        assert_eq!(encode("image/png", b"abc"), "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_parse_payload() {
        let url = DataUrl::parse("data:image/jpeg;base64,YWJj").unwrap();
        assert_eq!(url.mime(), "image/jpeg");
        assert_eq!(url.data(), b"abc");
        assert_eq!(url.image_mime().unwrap(), ImageMime::Jpeg);
    }

    #[test]
    fn test_parse_rejects_non_data_urls() {
        assert!(matches!(
            DataUrl::parse("https://example.com/a.png"),
            Err(DataUrlError::MissingScheme)
        ));
        assert!(matches!(
            DataUrl::parse("data:image/png;base64"),
            Err(DataUrlError::MissingPayload)
        ));
        assert!(matches!(
            DataUrl::parse("data:text/plain,hello"),
            Err(DataUrlError::NotBase64)
        ));
        assert!(matches!(
            DataUrl::parse("data:image/png;base64,***"),
            Err(DataUrlError::Base64(_))
        ));
    }

    #[test]
    fn test_unsupported_mime() {
        let url = DataUrl::parse("data:image/gif;base64,YWJj").unwrap();
        assert!(matches!(
            url.image_mime(),
            Err(DataUrlError::UnsupportedMime(m)) if m == "image/gif"
        ));
    }

    #[test]
    fn test_mime_from_name_and_type() {
        assert_eq!(ImageMime::from_file_name("photo.JPG"), Some(ImageMime::Jpeg));
        assert_eq!(ImageMime::from_file_name("a.b.png"), Some(ImageMime::Png));
        assert_eq!(ImageMime::from_file_name("notes.txt"), None);
        assert_eq!(ImageMime::from_file_name("png"), None);
        assert_eq!(ImageMime::from_mime("IMAGE/PNG"), Some(ImageMime::Png));
        assert_eq!(ImageMime::from_mime("image/webp"), None);
    }

    #[test]
    fn test_magic_detection() {
        assert_eq!(ImageMime::sniff(&PNG_MAGIC), Some(ImageMime::Png));
        assert_eq!(
            ImageMime::sniff(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]),
            Some(ImageMime::Jpeg)
        );
        assert_eq!(ImageMime::sniff(b"GIF89a"), None);
        assert_eq!(ImageMime::sniff(&[]), None);
    }
}
