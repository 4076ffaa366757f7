//! Model profiles and preprocessing parameters
//!
//! The tool exposes exactly two model profiles, `base` and `fast`, both backed
//! by a pre-built ISNet segmentation model fetched from `HuggingFace`. The fast
//! profile trades accuracy for speed by running inference at a reduced
//! resolution; inference cost scales with tensor area, so halving the edge
//! length roughly quarters the work.

use crate::cache::ModelCache;
use crate::error::{RemovalError, Result};
use std::path::PathBuf;

/// Default model repository used by both profiles
pub const DEFAULT_MODEL_URL: &str = "https://huggingface.co/imgly/isnet-general-onnx";

/// Relative path of the ONNX weights inside a model repository
pub const MODEL_FILE: &str = "onnx/model.onnx";

/// Which pre-built segmentation model profile to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelProfile {
    /// Full quality: 1024px inference resolution
    #[default]
    Base,
    /// Faster, less accurate: 512px inference resolution
    Fast,
}

impl ModelProfile {
    /// Stable identifier used for the cache directory name
    #[must_use]
    pub fn model_id(&self) -> &'static str {
        // Both profiles share the same weights; the cache holds one copy.
        "imgly--isnet-general-onnx"
    }

    /// Repository URL the weights are downloaded from
    #[must_use]
    pub fn repository_url(&self) -> &'static str {
        DEFAULT_MODEL_URL
    }

    /// Square inference resolution in pixels
    #[must_use]
    pub fn inference_size(&self) -> u32 {
        match self {
            Self::Base => 1024,
            Self::Fast => 512,
        }
    }

    /// Human readable profile name for status output
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Fast => "fast",
        }
    }

    /// Preprocessing parameters for this profile
    #[must_use]
    pub fn preprocessing_config(&self) -> PreprocessingConfig {
        PreprocessingConfig {
            target_size: [self.inference_size(), self.inference_size()],
            normalization_mean: [0.485, 0.456, 0.406],
            normalization_std: [0.229, 0.224, 0.225],
        }
    }
}

/// Image-to-tensor preprocessing parameters consumed by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessingConfig {
    /// Target tensor size (width, height)
    pub target_size: [u32; 2],
    /// Per-channel normalization mean (RGB, 0-1 range)
    pub normalization_mean: [f32; 3],
    /// Per-channel normalization standard deviation (RGB)
    pub normalization_std: [f32; 3],
}

/// Resolves a model profile against the on-disk cache and loads its weights
#[derive(Debug)]
pub struct ModelManager {
    profile: ModelProfile,
    cache: ModelCache,
}

impl ModelManager {
    /// Create a manager for the given profile using the default cache location
    pub fn new(profile: ModelProfile) -> Result<Self> {
        Ok(Self {
            profile,
            cache: ModelCache::new()?,
        })
    }

    /// Create a manager with an explicit cache
    #[must_use]
    pub fn with_cache(profile: ModelProfile, cache: ModelCache) -> Self {
        Self { profile, cache }
    }

    /// The profile this manager resolves
    #[must_use]
    pub fn profile(&self) -> ModelProfile {
        self.profile
    }

    /// Absolute path of the ONNX weights in the cache
    pub fn model_path(&self) -> Result<PathBuf> {
        let path = self
            .cache
            .model_path(self.profile.model_id())
            .join(MODEL_FILE);
        if !path.exists() {
            return Err(RemovalError::model(format!(
                "Model '{}' not found in cache at {}. Run with --only-download first or let the CLI auto-download it.",
                self.profile.model_id(),
                path.display()
            )));
        }
        Ok(path)
    }

    /// Read the raw ONNX weights from the cache
    pub fn load_model(&self) -> Result<Vec<u8>> {
        let path = self.model_path()?;
        std::fs::read(&path)
            .map_err(|e| RemovalError::file_io_error("read model weights", &path, &e))
    }

    /// Preprocessing parameters for the managed profile
    #[must_use]
    pub fn preprocessing_config(&self) -> PreprocessingConfig {
        self.profile.preprocessing_config()
    }
}
