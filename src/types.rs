//! Core types for background removal results

use crate::error::Result;
use image::{DynamicImage, RgbaImage};
use std::path::Path;

/// Single-channel foreground mask at the original image resolution
#[derive(Debug, Clone)]
pub struct SegmentationMask {
    /// Per-pixel alpha values, row-major, 0 = background, 255 = foreground
    pub data: Vec<u8>,
    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    /// Create a mask from raw alpha data
    #[must_use]
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Self {
        Self { data, dimensions }
    }

    /// Alpha value at a pixel, 0 when out of bounds
    #[must_use]
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        let (width, height) = self.dimensions;
        if x >= width || y >= height {
            return 0;
        }
        self.data.get((y * width + x) as usize).copied().unwrap_or(0)
    }

    /// Fraction of pixels considered foreground (alpha > 127)
    #[must_use]
    pub fn foreground_ratio(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let foreground = self.data.iter().filter(|&&a| a > 127).count();
        foreground as f64 / self.data.len() as f64
    }
}

/// Result of a background removal operation
#[derive(Debug, Clone)]
pub struct RemovalResult {
    /// The processed RGBA image with transparent background
    pub image: RgbaImage,
    /// The segmentation mask used for removal
    pub mask: SegmentationMask,
    /// Original image dimensions
    pub original_dimensions: (u32, u32),
    /// Original input path, when processing came from a file
    pub input_path: Option<String>,
}

impl RemovalResult {
    /// Create a new removal result
    #[must_use]
    pub fn new(image: RgbaImage, mask: SegmentationMask, original_dimensions: (u32, u32)) -> Self {
        Self {
            image,
            mask,
            original_dimensions,
            input_path: None,
        }
    }

    /// Attach the input path the result came from
    #[must_use]
    pub fn with_input_path(mut self, input_path: String) -> Self {
        self.input_path = Some(input_path);
        self
    }

    /// Save the result as PNG with alpha channel
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        DynamicImage::ImageRgba8(self.image.clone())
            .save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }

    /// Encode the result as PNG bytes
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        DynamicImage::ImageRgba8(self.image.clone()).write_to(
            &mut std::io::Cursor::new(&mut buffer),
            image::ImageFormat::Png,
        )?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_alpha_lookup() {
        let mask = SegmentationMask::new(vec![0, 64, 128, 255], (2, 2));
        assert_eq!(mask.alpha_at(0, 0), 0);
        assert_eq!(mask.alpha_at(1, 0), 64);
        assert_eq!(mask.alpha_at(0, 1), 128);
        assert_eq!(mask.alpha_at(1, 1), 255);
        assert_eq!(mask.alpha_at(5, 5), 0);
    }

    #[test]
    fn test_foreground_ratio() {
        let mask = SegmentationMask::new(vec![0, 0, 255, 255], (2, 2));
        assert!((mask.foreground_ratio() - 0.5).abs() < f64::EPSILON);

        let empty = SegmentationMask::new(vec![], (0, 0));
        assert!(empty.foreground_ratio().abs() < f64::EPSILON);
    }

    #[test]
    fn test_png_round_trip() {
        let image = RgbaImage::from_pixel(4, 4, image::Rgba([200, 100, 50, 128]));
        let mask = SegmentationMask::new(vec![128; 16], (4, 4));
        let result = RemovalResult::new(image, mask, (4, 4));

        let bytes = result.to_png_bytes().unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (4, 4));
        assert_eq!(decoded.get_pixel(0, 0).0, [200, 100, 50, 128]);
    }

    #[test]
    fn test_save_png_writes_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("out.png");

        let image = RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 0]));
        let mask = SegmentationMask::new(vec![0; 4], (2, 2));
        RemovalResult::new(image, mask, (2, 2))
            .save_png(&path)
            .unwrap();

        assert!(path.exists());
    }
}
