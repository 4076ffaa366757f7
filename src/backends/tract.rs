//! Tract backend for running the background segmentation model
//!
//! Wraps Tract, a pure Rust neural network inference library, so model
//! execution needs no C++ runtime or system libraries. The ONNX weights come
//! from the model cache via [`ModelManager`].

use crate::error::{RemovalError, Result};
use crate::inference::InferenceBackend;
use crate::models::{ModelManager, PreprocessingConfig};
use ndarray::Array4;
use tract_onnx::prelude::*;
use tracing::{debug, info};

/// Type alias for the complex Tract model type
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

// Use instant crate for cross-platform time compatibility
use instant::Instant;

/// Pure Rust inference backend for the segmentation model
pub struct TractBackend {
    model: Option<TractModel>,
    model_manager: ModelManager,
}

impl TractBackend {
    /// Create an uninitialized backend for the given model manager
    #[must_use]
    pub fn new(model_manager: ModelManager) -> Self {
        Self {
            model: None,
            model_manager,
        }
    }

    /// Load and optimize the ONNX model
    fn load_model(&mut self) -> Result<()> {
        let model_load_start = Instant::now();

        let model_data = self.model_manager.load_model()?;
        let inference_size = self.model_manager.profile().inference_size() as i64;

        info!(
            profile = self.model_manager.profile().name(),
            size_bytes = model_data.len(),
            "Loading segmentation model"
        );

        // Pin the input shape to the profile's resolution so Tract can fully
        // optimize the graph.
        let model = onnx()
            .model_for_read(&mut std::io::Cursor::new(model_data))
            .map_err(|e| RemovalError::model(format!("Failed to load ONNX model: {e}")))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec![1, 3, inference_size, inference_size]),
            )
            .map_err(|e| RemovalError::model(format!("Failed to set model input shape: {e}")))?
            .into_optimized()
            .map_err(|e| RemovalError::model(format!("Failed to optimize model: {e}")))?
            .into_runnable()
            .map_err(|e| RemovalError::model(format!("Failed to create runnable model: {e}")))?;

        self.model = Some(model);

        info!(
            "Tract backend initialized in {:.2}ms",
            model_load_start.elapsed().as_millis()
        );
        Ok(())
    }
}

impl InferenceBackend for TractBackend {
    fn initialize(&mut self) -> Result<()> {
        if self.model.is_some() {
            return Ok(());
        }
        self.load_model()
    }

    #[allow(clippy::get_first)]
    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| RemovalError::inference("Tract model not initialized"))?;

        debug!("Running inference on tensor {:?}", input.shape());
        let inference_start = Instant::now();

        let input_tensor = Tensor::from(input.clone());

        let outputs = model
            .run(tvec![input_tensor.into()])
            .map_err(|e| RemovalError::inference(format!("Tract inference failed: {e}")))?;

        let output_tensor = outputs
            .into_iter()
            .next()
            .ok_or_else(|| RemovalError::inference("No output tensor found"))?
            .into_arc_tensor();

        let output_data = output_tensor
            .to_array_view::<f32>()
            .map_err(|e| RemovalError::inference(format!("Failed to convert output tensor: {e}")))?;

        let output_shape = output_data.shape();
        if output_shape.len() != 4 {
            return Err(RemovalError::inference(format!(
                "Expected 4D output tensor, got {}D",
                output_shape.len()
            )));
        }

        let output_array = Array4::from_shape_vec(
            (
                output_shape.get(0).copied().unwrap_or(1),
                output_shape.get(1).copied().unwrap_or(1),
                output_shape.get(2).copied().unwrap_or(1),
                output_shape.get(3).copied().unwrap_or(1),
            ),
            output_data.to_owned().into_raw_vec_and_offset().0,
        )
        .map_err(|e| RemovalError::inference(format!("Failed to reshape output tensor: {e}")))?;

        debug!(
            "Inference completed in {:.2}ms, output {:?}",
            inference_start.elapsed().as_millis(),
            output_array.shape()
        );

        Ok(output_array)
    }

    fn is_initialized(&self) -> bool {
        self.model.is_some()
    }

    fn preprocessing_config(&self) -> PreprocessingConfig {
        self.model_manager.preprocessing_config()
    }
}
