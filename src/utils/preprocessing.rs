//! Image-to-tensor preprocessing
//!
//! Converts an input image into the normalized NCHW tensor the segmentation
//! model expects: RGB conversion, aspect ratio preserving resize, white
//! center padding to the square inference resolution, then per-channel
//! normalization.

use crate::error::{RemovalError, Result};
use crate::models::PreprocessingConfig;
use image::{DynamicImage, ImageBuffer, RgbImage};
use ndarray::Array4;

/// Padding color used to fill the canvas around the resized image
const PADDING_COLOR: [u8; 3] = [255, 255, 255];

/// Shared image preprocessing utilities
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Preprocess an image into a `[1, 3, S, S]` tensor for inference
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn preprocess_for_inference(
        image: &DynamicImage,
        preprocessing_config: &PreprocessingConfig,
    ) -> Result<Array4<f32>> {
        let target_size = preprocessing_config.target_size[0];

        // Convert to RGB (drops any existing alpha channel)
        let rgb_image = image.to_rgb8();
        let (orig_width, orig_height) = rgb_image.dimensions();

        if orig_width == 0 || orig_height == 0 {
            return Err(RemovalError::processing("Input image has zero dimensions"));
        }

        let target_size_f32 = target_size as f32;
        let scale =
            (target_size_f32 / orig_width as f32).min(target_size_f32 / orig_height as f32);

        let new_width = ((orig_width as f32) * scale).round() as u32;
        let new_height = ((orig_height as f32) * scale).round() as u32;

        // Resize maintaining aspect ratio
        let resized = image::imageops::resize(
            &rgb_image,
            new_width.max(1),
            new_height.max(1),
            image::imageops::FilterType::Triangle,
        );

        // Center the resized image on a white square canvas
        let mut canvas = ImageBuffer::from_pixel(target_size, target_size, image::Rgb(PADDING_COLOR));
        let offset_x = (target_size - new_width.min(target_size)) / 2;
        let offset_y = (target_size - new_height.min(target_size)) / 2;

        for (x, y, pixel) in resized.enumerate_pixels() {
            let canvas_x = x + offset_x;
            let canvas_y = y + offset_y;
            if canvas_x < target_size && canvas_y < target_size {
                canvas.put_pixel(canvas_x, canvas_y, *pixel);
            }
        }

        Ok(Self::canvas_to_tensor(
            &canvas,
            preprocessing_config,
            target_size as usize,
        ))
    }

    /// Convert canvas to normalized NCHW tensor
    fn canvas_to_tensor(
        canvas: &RgbImage,
        preprocessing_config: &PreprocessingConfig,
        target_size: usize,
    ) -> Array4<f32> {
        let mut tensor = Array4::<f32>::zeros((1, 3, target_size, target_size));

        #[allow(clippy::indexing_slicing)]
        // Tensor dimensions pre-allocated to match canvas size
        for (y, row) in canvas.rows().enumerate() {
            for (x, pixel) in row.enumerate() {
                for channel in 0..3 {
                    let normalized = (f32::from(pixel[channel]) / 255.0
                        - preprocessing_config.normalization_mean[channel])
                        / preprocessing_config.normalization_std[channel];
                    tensor[[0, channel, y, x]] = normalized;
                }
            }
        }

        tensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn test_config(size: u32) -> PreprocessingConfig {
        PreprocessingConfig {
            target_size: [size, size],
            normalization_mean: [0.485, 0.456, 0.406],
            normalization_std: [0.229, 0.224, 0.225],
        }
    }

    fn solid_image(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(width, height, Rgb(color));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_tensor_shape() {
        let image = solid_image(100, 100, [255, 0, 0]);
        let tensor =
            ImagePreprocessor::preprocess_for_inference(&image, &test_config(256)).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 256, 256]);
    }

    #[test]
    fn test_wide_image_is_padded_vertically() {
        let image = solid_image(200, 50, [0, 0, 0]);
        let config = test_config(128);
        let tensor = ImagePreprocessor::preprocess_for_inference(&image, &config).unwrap();

        // Top rows are white padding: (1.0 - mean) / std for the red channel
        let expected_padding = (1.0 - config.normalization_mean[0]) / config.normalization_std[0];
        assert!((tensor[[0, 0, 0, 0]] - expected_padding).abs() < 1e-5);

        // Center rows come from the black image: (0.0 - mean) / std
        let expected_black = (0.0 - config.normalization_mean[0]) / config.normalization_std[0];
        assert!((tensor[[0, 0, 64, 64]] - expected_black).abs() < 1e-5);
    }

    #[test]
    fn test_normalization_values() {
        let image = solid_image(64, 64, [128, 128, 128]);
        let config = test_config(64);
        let tensor = ImagePreprocessor::preprocess_for_inference(&image, &config).unwrap();

        for channel in 0..3 {
            let expected = (128.0 / 255.0 - config.normalization_mean[channel])
                / config.normalization_std[channel];
            assert!((tensor[[0, channel, 32, 32]] - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_rgba_input_converted_to_rgb() {
        let img = ImageBuffer::from_pixel(32, 32, image::Rgba([10u8, 20, 30, 128]));
        let image = DynamicImage::ImageRgba8(img);
        let tensor =
            ImagePreprocessor::preprocess_for_inference(&image, &test_config(32)).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 32, 32]);
    }
}
