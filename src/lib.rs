#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! # nobg
//!
//! Background removal for images, built around a pre-built third-party
//! segmentation model executed through Tract (pure Rust ONNX inference).
//! The crate contains no segmentation logic of its own: it loads images,
//! hands them to the model, composites the predicted alpha mask over the
//! original pixels and writes transparent PNGs.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use nobg::{BackgroundRemover, ModelDownloader, ModelProfile, RemovalConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Download and cache the model (one-time setup)
//! let downloader = ModelDownloader::new()?;
//! downloader
//!     .download_model(ModelProfile::Base.repository_url(), true)
//!     .await?;
//!
//! // Process an image
//! let config = RemovalConfig::builder().model(ModelProfile::Base).build()?;
//! let mut remover = BackgroundRemover::new(config)?;
//! let result = remover.process_file("input.jpg")?;
//! result.save_png("output.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! - `cli` (default): command-line interface and progress reporting
//! - `clipboard` (default): copy results to the system clipboard

pub mod backends;
pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "clipboard")]
pub mod clipboard;
pub mod config;
pub mod download;
pub mod error;
pub mod inference;
pub mod models;
pub mod postprocess;
pub mod processor;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
pub use backends::TractBackend;
pub use cache::{format_size, CachedModelInfo, ModelCache, ModelMetadata};
#[cfg(feature = "clipboard")]
pub use clipboard::copy_image_to_clipboard;
pub use config::{RemovalConfig, RemovalConfigBuilder};
pub use download::{validate_model_url, ModelDownloader};
pub use error::{RemovalError, Result};
pub use inference::InferenceBackend;
pub use models::{ModelManager, ModelProfile, PreprocessingConfig};
pub use postprocess::{invert_dark_colors, InvertOptions};
pub use processor::BackgroundRemover;
pub use services::{is_supported_image, resolve_output_path, DEFAULT_SUFFIX};
pub use types::{RemovalResult, SegmentationMask};

#[cfg(feature = "cli")]
pub use tracing_config::{TracingConfig, TracingFormat};

/// Remove the background from an in-memory image
///
/// Convenience wrapper that builds a [`BackgroundRemover`] for one call.
/// For batches, construct the remover once and reuse it so the model is
/// only loaded once.
pub fn remove_background_from_image(
    image: &image::DynamicImage,
    config: RemovalConfig,
) -> Result<RemovalResult> {
    let mut remover = BackgroundRemover::new(config)?;
    remover.process_image(image)
}

/// Remove the background from an encoded image buffer
pub fn remove_background_from_bytes(
    image_bytes: &[u8],
    config: RemovalConfig,
) -> Result<RemovalResult> {
    let image = image::load_from_memory(image_bytes)
        .map_err(|e| RemovalError::processing(format!("Failed to decode image from bytes: {e}")))?;
    remove_background_from_image(&image, config)
}
