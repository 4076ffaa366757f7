//! System clipboard integration
//!
//! Copies the processed RGBA image to the system clipboard so the result can
//! be pasted straight into another application without touching the saved
//! file.

use crate::error::{RemovalError, Result};
use image::RgbaImage;
use std::borrow::Cow;

/// Copy an RGBA image to the system clipboard
pub fn copy_image_to_clipboard(image: &RgbaImage) -> Result<()> {
    let (width, height) = image.dimensions();

    let mut clipboard = arboard::Clipboard::new()
        .map_err(|e| RemovalError::processing(format!("Failed to access clipboard: {e}")))?;

    let image_data = arboard::ImageData {
        width: width as usize,
        height: height as usize,
        bytes: Cow::Borrowed(image.as_raw()),
    };

    clipboard
        .set_image(image_data)
        .map_err(|e| RemovalError::processing(format!("Failed to copy image to clipboard: {e}")))?;

    Ok(())
}
