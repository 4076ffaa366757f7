//! Background removal pipeline
//!
//! `BackgroundRemover` owns the inference backend and runs the per-image
//! pipeline: load, RGB conversion, preprocessing, model inference, mapping
//! the predicted tensor back onto the original pixel grid, alpha
//! compositing, and the optional dark-color inversion pass.

use crate::config::RemovalConfig;
use crate::error::{RemovalError, Result};
use crate::inference::InferenceBackend;
use crate::models::ModelManager;
use crate::postprocess::invert_dark_colors;
use crate::services::io::load_image;
use crate::types::{RemovalResult, SegmentationMask};
use crate::utils::ImagePreprocessor;
use image::{DynamicImage, ImageBuffer, RgbaImage};
use instant::Instant;
use ndarray::Array4;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Inverse of the preprocessing transform, mapping original pixel
/// coordinates into tensor coordinates
#[derive(Debug, Clone)]
struct CoordinateTransformation {
    /// Scale factor used during preprocessing
    scale: f32,
    /// X offset for centering
    offset_x: u32,
    /// Y offset for centering
    offset_y: u32,
    /// Mask width in tensor coordinates
    mask_width: u32,
    /// Mask height in tensor coordinates
    mask_height: u32,
}

/// Runs the background removal pipeline for one image at a time
pub struct BackgroundRemover {
    config: RemovalConfig,
    backend: Box<dyn InferenceBackend>,
}

impl BackgroundRemover {
    /// Create a remover with the default Tract backend for the configured
    /// model profile
    pub fn new(config: RemovalConfig) -> Result<Self> {
        let model_manager = ModelManager::new(config.model)?;
        let backend = Box::new(crate::backends::TractBackend::new(model_manager));
        Ok(Self::with_backend(config, backend))
    }

    /// Create a remover with an explicit backend
    #[must_use]
    pub fn with_backend(config: RemovalConfig, backend: Box<dyn InferenceBackend>) -> Self {
        Self { config, backend }
    }

    /// The configuration this remover runs with
    #[must_use]
    pub fn config(&self) -> &RemovalConfig {
        &self.config
    }

    /// Load the model if it has not been loaded yet
    pub fn initialize(&mut self) -> Result<()> {
        if self.backend.is_initialized() {
            return Ok(());
        }
        info!(model = self.config.model.name(), "Initializing background remover");
        self.backend.initialize()
    }

    /// Process one image file and return the transparent result
    pub fn process_file<P: AsRef<Path>>(&mut self, input_path: P) -> Result<RemovalResult> {
        let input_path = input_path.as_ref();
        let image = load_image(input_path)?;
        let result = self.process_image(&image)?;
        Ok(result.with_input_path(input_path.display().to_string()))
    }

    /// Process an in-memory image and return the transparent result
    #[instrument(
        skip(self, image),
        fields(
            model = self.config.model.name(),
            dimensions = %format!("{}x{}", image.width(), image.height())
        )
    )]
    pub fn process_image(&mut self, image: &DynamicImage) -> Result<RemovalResult> {
        self.initialize()?;

        let total_start = Instant::now();
        let original_dimensions = (image.width(), image.height());

        let preprocessing_config = self.backend.preprocessing_config();
        let input_tensor =
            ImagePreprocessor::preprocess_for_inference(image, &preprocessing_config)?;

        let output_tensor = self.backend.infer(&input_tensor)?;

        let mask = Self::tensor_to_mask(&output_tensor, original_dimensions)?;
        let mut result_image = Self::apply_mask(image, &mask);

        if let Some(options) = self.config.invert {
            invert_dark_colors(&mut result_image, options);
        }

        debug!(
            total_ms = total_start.elapsed().as_millis() as u64,
            foreground_ratio = mask.foreground_ratio(),
            "Image processed"
        );

        Ok(RemovalResult::new(result_image, mask, original_dimensions))
    }

    /// Convert the output tensor to a segmentation mask at the original
    /// resolution, undoing the preprocessing resize and padding
    fn tensor_to_mask(
        tensor: &Array4<f32>,
        original_dimensions: (u32, u32),
    ) -> Result<SegmentationMask> {
        Self::validate_tensor_shape(tensor)?;
        let transformation = Self::inverse_transformation(tensor, original_dimensions);
        let mask_data = Self::extract_mask_values(tensor, original_dimensions, &transformation);
        Ok(SegmentationMask::new(mask_data, original_dimensions))
    }

    /// Validate tensor shape for mask generation
    #[allow(clippy::get_first)]
    fn validate_tensor_shape(tensor: &Array4<f32>) -> Result<()> {
        let shape = tensor.shape();
        if shape.get(0).copied().unwrap_or(0) != 1 || shape.get(1).copied().unwrap_or(0) != 1 {
            return Err(RemovalError::processing(format!(
                "Invalid output tensor shape {shape:?}, expected [1, 1, H, W]"
            )));
        }
        Ok(())
    }

    /// Reproduce the preprocessing scale and centering offsets
    fn inverse_transformation(
        tensor: &Array4<f32>,
        original_dimensions: (u32, u32),
    ) -> CoordinateTransformation {
        let shape = tensor.shape();
        let mask_height = shape.get(2).copied().unwrap_or(0) as u32;
        let mask_width = shape.get(3).copied().unwrap_or(0) as u32;
        let (orig_width, orig_height) = original_dimensions;

        // Square tensor assumed, matching the preprocessor's canvas
        let target_size = mask_width as f32;
        let scale = (target_size / orig_width as f32).min(target_size / orig_height as f32);

        let scaled_width = ((orig_width as f32) * scale).round() as u32;
        let scaled_height = ((orig_height as f32) * scale).round() as u32;

        let offset_x = (mask_width - scaled_width.min(mask_width)) / 2;
        let offset_y = (mask_height - scaled_height.min(mask_height)) / 2;

        CoordinateTransformation {
            scale,
            offset_x,
            offset_y,
            mask_width,
            mask_height,
        }
    }

    /// Sample the tensor for every original pixel
    fn extract_mask_values(
        tensor: &Array4<f32>,
        original_dimensions: (u32, u32),
        transformation: &CoordinateTransformation,
    ) -> Vec<u8> {
        let (orig_width, orig_height) = original_dimensions;
        let mut mask_data = Vec::with_capacity((orig_width as usize) * (orig_height as usize));

        for y in 0..orig_height {
            for x in 0..orig_width {
                let value = Self::tensor_value_at(tensor, x, y, transformation);
                mask_data.push((value.clamp(0.0, 1.0) * 255.0) as u8);
            }
        }

        mask_data
    }

    /// Tensor value for one original pixel, 0 outside the prediction area
    fn tensor_value_at(
        tensor: &Array4<f32>,
        x: u32,
        y: u32,
        transformation: &CoordinateTransformation,
    ) -> f32 {
        let scaled_x = ((x as f32) * transformation.scale).round() as u32;
        let scaled_y = ((y as f32) * transformation.scale).round() as u32;

        let tensor_x = scaled_x + transformation.offset_x;
        let tensor_y = scaled_y + transformation.offset_y;

        if tensor_x < transformation.mask_width && tensor_y < transformation.mask_height {
            tensor
                .get([0, 0, tensor_y as usize, tensor_x as usize])
                .copied()
                .unwrap_or(0.0)
        } else {
            0.0
        }
    }

    /// Composite the mask onto the original pixels as the alpha channel
    fn apply_mask(image: &DynamicImage, mask: &SegmentationMask) -> RgbaImage {
        let rgba_image = image.to_rgba8();
        let (width, height) = rgba_image.dimensions();
        let mut result = ImageBuffer::new(width, height);

        for (x, y, pixel) in rgba_image.enumerate_pixels() {
            let alpha = mask.alpha_at(x, y);
            if alpha > 0 {
                result.put_pixel(x, y, image::Rgba([pixel[0], pixel[1], pixel[2], alpha]));
            } else {
                result.put_pixel(x, y, image::Rgba([0, 0, 0, 0]));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ModelProfile, PreprocessingConfig};
    use crate::postprocess::InvertOptions;

    /// Backend producing a fixed foreground probability for the center
    /// square of the tensor and background elsewhere
    struct MockBackend {
        initialized: bool,
        tensor_size: usize,
    }

    impl MockBackend {
        fn new(tensor_size: usize) -> Self {
            Self {
                initialized: false,
                tensor_size,
            }
        }
    }

    impl InferenceBackend for MockBackend {
        fn initialize(&mut self) -> Result<()> {
            self.initialized = true;
            Ok(())
        }

        fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
            assert_eq!(input.shape()[0], 1);
            assert_eq!(input.shape()[1], 3);

            let size = self.tensor_size;
            let mut output = Array4::<f32>::zeros((1, 1, size, size));
            let quarter = size / 4;
            for y in quarter..(size - quarter) {
                for x in quarter..(size - quarter) {
                    output[[0, 0, y, x]] = 1.0;
                }
            }
            Ok(output)
        }

        fn is_initialized(&self) -> bool {
            self.initialized
        }

        fn preprocessing_config(&self) -> PreprocessingConfig {
            PreprocessingConfig {
                target_size: [self.tensor_size as u32, self.tensor_size as u32],
                normalization_mean: [0.485, 0.456, 0.406],
                normalization_std: [0.229, 0.224, 0.225],
            }
        }
    }

    fn mock_remover(config: RemovalConfig) -> BackgroundRemover {
        BackgroundRemover::with_backend(config, Box::new(MockBackend::new(64)))
    }

    #[test]
    fn test_center_foreground_kept_edges_removed() {
        let config = RemovalConfig::builder().build().unwrap();
        let mut remover = mock_remover(config);

        let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            64,
            64,
            image::Rgb([200, 150, 100]),
        ));
        let result = remover.process_image(&image).unwrap();

        assert_eq!(result.original_dimensions, (64, 64));
        assert_eq!(result.image.dimensions(), (64, 64));

        // Center pixel is foreground with original color
        assert_eq!(result.image.get_pixel(32, 32).0, [200, 150, 100, 255]);
        // Corner pixel is fully transparent
        assert_eq!(result.image.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_mask_matches_original_dimensions() {
        let config = RemovalConfig::builder().build().unwrap();
        let mut remover = mock_remover(config);

        // Non-square input exercises the padding inverse transform
        let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            128,
            32,
            image::Rgb([10, 10, 10]),
        ));
        let result = remover.process_image(&image).unwrap();

        assert_eq!(result.mask.dimensions, (128, 32));
        assert_eq!(result.mask.data.len(), 128 * 32);
    }

    #[test]
    fn test_dark_mode_inversion_applied() {
        let config = RemovalConfig::builder()
            .invert(InvertOptions {
                threshold: 128,
                brightness_boost: 1.0,
            })
            .build()
            .unwrap();
        let mut remover = mock_remover(config);

        let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            64,
            64,
            image::Rgb([10, 20, 30]),
        ));
        let result = remover.process_image(&image).unwrap();

        // Foreground center pixel was dark, so it should come back inverted
        assert_eq!(result.image.get_pixel(32, 32).0, [245, 235, 225, 255]);
        // Background corner stays transparent
        assert_eq!(result.image.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let config = RemovalConfig::builder().model(ModelProfile::Fast).build().unwrap();
        let mut remover = mock_remover(config);

        remover.initialize().unwrap();
        remover.initialize().unwrap();
        let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(8, 8, image::Rgb([0; 3])));
        assert!(remover.process_image(&image).is_ok());
    }

    #[test]
    fn test_rejects_bad_tensor_shape() {
        let tensor = Array4::<f32>::zeros((1, 3, 8, 8));
        assert!(BackgroundRemover::validate_tensor_shape(&tensor).is_err());

        let tensor = Array4::<f32>::zeros((1, 1, 8, 8));
        assert!(BackgroundRemover::validate_tensor_shape(&tensor).is_ok());
    }

    #[test]
    fn test_process_file_missing_input() {
        let config = RemovalConfig::builder().build().unwrap();
        let mut remover = mock_remover(config);
        assert!(remover.process_file("/nonexistent/photo.jpg").is_err());
    }

    #[test]
    fn test_process_file_records_input_path() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("photo.png");
        image::RgbImage::from_pixel(16, 16, image::Rgb([50, 50, 50]))
            .save(&path)
            .unwrap();

        let config = RemovalConfig::builder().build().unwrap();
        let mut remover = mock_remover(config);
        let result = remover.process_file(&path).unwrap();

        assert_eq!(result.input_path.unwrap(), path.display().to_string());
    }
}
