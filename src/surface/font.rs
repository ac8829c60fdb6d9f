//! Font discovery for the software rasterizer.

use std::path::Path;

use ab_glyph::FontArc;

/// Well-known system font locations, tried in order.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/Carlito-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Load a font file.
pub fn load_font_file(path: &Path) -> Option<FontArc> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            log::debug!("Cannot read font {:?}: {}", path, e);
            return None;
        }
    };
    match FontArc::try_from_vec(data) {
        Ok(font) => Some(font),
        Err(e) => {
            log::warn!("Failed to parse font {:?}: {}", path, e);
            None
        }
    }
}

/// Load the configured font, falling back to common system fonts.
pub fn load_font(configured: Option<&Path>) -> Option<FontArc> {
    if let Some(path) = configured {
        if let Some(font) = load_font_file(path) {
            log::info!("Using configured font {:?}", path);
            return Some(font);
        }
        log::warn!("Configured font {:?} unusable, trying system fonts", path);
    }

    for candidate in SYSTEM_FONT_CANDIDATES {
        let path = Path::new(candidate);
        if path.exists() {
            if let Some(font) = load_font_file(path) {
                log::debug!("Using system font {:?}", path);
                return Some(font);
            }
        }
    }

    log::warn!("No usable font found; text cannot be rasterized");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_none() {
        assert!(load_font_file(Path::new("/definitely/not/a/font.ttf")).is_none());
    }

    #[test]
    fn test_non_font_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        assert!(load_font_file(&path).is_none());
    }
}
