//! Configuration for background removal operations

use crate::error::{RemovalError, Result};
use crate::models::ModelProfile;
use crate::postprocess::InvertOptions;

/// Configuration for a background removal run
#[derive(Debug, Clone, Default)]
pub struct RemovalConfig {
    /// Model profile to run (base or fast)
    pub model: ModelProfile,
    /// Optional dark-color inversion applied after mask compositing
    pub invert: Option<InvertOptions>,
    /// Enable debug output
    pub debug: bool,
}

impl RemovalConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> RemovalConfigBuilder {
        RemovalConfigBuilder::default()
    }
}

/// Builder for [`RemovalConfig`]
#[derive(Debug, Default)]
pub struct RemovalConfigBuilder {
    model: ModelProfile,
    invert: Option<InvertOptions>,
    debug: bool,
}

impl RemovalConfigBuilder {
    /// Set the model profile
    #[must_use]
    pub fn model(mut self, model: ModelProfile) -> Self {
        self.model = model;
        self
    }

    /// Enable dark-color inversion with the given options
    #[must_use]
    pub fn invert(mut self, options: InvertOptions) -> Self {
        self.invert = Some(options);
        self
    }

    /// Enable debug output
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<RemovalConfig> {
        if let Some(ref options) = self.invert {
            if options.brightness_boost <= 0.0 || !options.brightness_boost.is_finite() {
                return Err(RemovalError::invalid_config(format!(
                    "brightness boost must be a positive number, got {}",
                    options.brightness_boost
                )));
            }
        }

        Ok(RemovalConfig {
            model: self.model,
            invert: self.invert,
            debug: self.debug,
        })
    }
}
