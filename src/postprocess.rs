//! Dark-color inversion for dark-mode hosts
//!
//! Transparent PNGs with dark line art become invisible on dark backgrounds
//! (note-taking apps, dark-themed editors). This pass inverts pixels whose
//! perceived luminance falls below a threshold and boosts their brightness,
//! leaving the alpha channel untouched.

use image::RgbaImage;

/// Options controlling dark-color inversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvertOptions {
    /// Luminance threshold (0-255); pixels darker than this are inverted
    pub threshold: u8,
    /// Brightness multiplier applied to inverted pixels, clamped to 255
    pub brightness_boost: f32,
}

impl Default for InvertOptions {
    fn default() -> Self {
        Self {
            threshold: 128,
            brightness_boost: 1.2,
        }
    }
}

/// Perceived luminance of an RGB pixel (ITU-R BT.601 weights)
fn luminance(r: u8, g: u8, b: u8) -> f32 {
    0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)
}

/// Invert dark colors in place, preserving transparency
pub fn invert_dark_colors(image: &mut RgbaImage, options: InvertOptions) {
    let threshold = f32::from(options.threshold);

    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;

        // RGB under a fully transparent pixel is invisible
        if a == 0 {
            continue;
        }

        if luminance(r, g, b) < threshold {
            let inverted = [255 - r, 255 - g, 255 - b];
            let boosted = inverted.map(|c| {
                (f32::from(c) * options.brightness_boost).clamp(0.0, 255.0) as u8
            });
            pixel.0 = [boosted[0], boosted[1], boosted[2], a];
        }
    }
}
