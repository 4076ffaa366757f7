//! Image loading with format gating

use crate::error::{RemovalError, Result};
use image::DynamicImage;
use std::path::Path;

/// File extensions accepted as input images
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "tiff", "tif"];

/// Whether a path carries a supported image extension
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
}

/// Load an image file, validating existence and format first
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    if !path.exists() {
        return Err(RemovalError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        )));
    }

    if !is_supported_image(path) {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("(none)");
        return Err(RemovalError::unsupported_format(format!(
            "'{}' has unsupported extension '{extension}'. Supported: {}",
            path.display(),
            SUPPORTED_EXTENSIONS.join(", ")
        )));
    }

    image::open(path).map_err(|e| RemovalError::image_load_error(path, &e))
}
