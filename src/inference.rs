//! Inference backend abstraction
//!
//! The segmentation model is an opaque collaborator: a backend takes a
//! normalized NCHW tensor and returns a single-channel alpha prediction.
//! Everything about how the network executes lives behind this trait.

use crate::error::Result;
use crate::models::PreprocessingConfig;
use ndarray::Array4;

/// Backend capable of running the background segmentation model
pub trait InferenceBackend {
    /// Load the model and prepare it for inference
    fn initialize(&mut self) -> Result<()>;

    /// Run inference on a preprocessed `[1, 3, H, W]` tensor, producing a
    /// `[1, 1, H, W]` foreground probability tensor
    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>>;

    /// Whether the model has been loaded
    fn is_initialized(&self) -> bool;

    /// Preprocessing parameters the model expects
    fn preprocessing_config(&self) -> PreprocessingConfig;
}
