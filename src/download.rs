//! Model download into the local cache
//!
//! Downloads the ONNX weights for a model repository into a temporary
//! directory and atomically moves them into the cache once complete, so a
//! crashed download never leaves a half-populated cache entry behind.

use crate::cache::{ModelCache, ModelMetadata};
use crate::error::{RemovalError, Result};
use crate::models::MODEL_FILE;
use chrono::Utc;
use futures_util::TryStreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};

#[cfg(feature = "cli")]
use indicatif::{ProgressBar, ProgressStyle};

/// Progress indicator abstraction so the download path works without the CLI
/// feature enabled
pub enum ProgressIndicator {
    /// Indicatif progress bar (CLI builds)
    #[cfg(feature = "cli")]
    Indicatif(ProgressBar),
    /// No progress reporting (library builds)
    NoOp,
}

impl ProgressIndicator {
    /// Update the progress message
    pub fn set_message(&self, msg: String) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.set_message(msg),
            Self::NoOp => {
                let _ = msg;
            },
        }
    }

    /// Set the total length in bytes
    pub fn set_length(&self, len: u64) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.set_length(len),
            Self::NoOp => {
                let _ = len;
            },
        }
    }

    /// Set the current position in bytes
    pub fn set_position(&self, pos: u64) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.set_position(pos),
            Self::NoOp => {
                let _ = pos;
            },
        }
    }

    /// Finish with a final message
    pub fn finish_with_message(&self, msg: String) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.finish_with_message(msg),
            Self::NoOp => {
                let _ = msg;
            },
        }
    }
}

/// Downloads model weights from `HuggingFace` repositories into the cache
pub struct ModelDownloader {
    client: Client,
    cache: ModelCache,
}

impl ModelDownloader {
    /// Create a new downloader with the default cache
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: Self::build_client()?,
            cache: ModelCache::new()?,
        })
    }

    /// Create a downloader writing into an explicit cache
    pub fn with_cache(cache: ModelCache) -> Result<Self> {
        Ok(Self {
            client: Self::build_client()?,
            cache,
        })
    }

    fn build_client() -> Result<Client> {
        Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| RemovalError::network_error("Failed to create HTTP client", e))
    }

    /// The cache this downloader writes into
    #[must_use]
    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    /// Download a model repository's weights into the cache
    ///
    /// Returns the model id the weights are cached under. If the model is
    /// already cached this is a no-op.
    pub async fn download_model(&self, url: &str, show_progress: bool) -> Result<String> {
        validate_model_url(url)?;

        let model_id = ModelCache::url_to_model_id(url);
        info!("Downloading model from: {url}");
        info!("Model ID: {model_id}");

        if self.cache.is_model_cached(&model_id) {
            info!("Model already cached: {model_id}");
            return Ok(model_id);
        }

        let temp_dir = Self::create_temp_download_dir(&model_id)?;
        let final_dir = self.cache.model_path(&model_id);

        let progress = if show_progress {
            Some(Self::create_progress_indicator())
        } else {
            None
        };

        match self.download_weights(url, &temp_dir, progress.as_ref()).await {
            Ok(sha256) => {
                // Atomic move from temp to final location
                if final_dir.exists() {
                    fs::remove_dir_all(&final_dir).map_err(|e| {
                        RemovalError::file_io_error(
                            "remove existing model directory",
                            &final_dir,
                            &e,
                        )
                    })?;
                }
                fs::rename(&temp_dir, &final_dir).map_err(|e| {
                    RemovalError::file_io_error("move downloaded model to cache", &final_dir, &e)
                })?;

                self.cache.write_metadata(
                    &model_id,
                    &ModelMetadata {
                        source_url: url.to_string(),
                        sha256,
                        downloaded_at: Utc::now(),
                    },
                )?;

                if let Some(pb) = progress {
                    pb.finish_with_message(format!("✅ Downloaded {model_id}"));
                }
                info!("Successfully downloaded model: {model_id}");
                Ok(model_id)
            },
            Err(e) => {
                if temp_dir.exists() {
                    if let Err(cleanup_err) = fs::remove_dir_all(&temp_dir) {
                        warn!("Failed to cleanup temp directory: {cleanup_err}");
                    }
                }
                if let Some(pb) = progress {
                    pb.finish_with_message("❌ Download failed".to_string());
                }
                Err(e)
            },
        }
    }

    /// Create a temporary directory for downloading
    fn create_temp_download_dir(model_id: &str) -> Result<PathBuf> {
        let temp_dir = std::env::temp_dir().join(format!("nobg-{model_id}"));

        if temp_dir.exists() {
            fs::remove_dir_all(&temp_dir).map_err(|e| {
                RemovalError::file_io_error("remove existing temp directory", &temp_dir, &e)
            })?;
        }
        fs::create_dir_all(&temp_dir)
            .map_err(|e| RemovalError::file_io_error("create temp directory", &temp_dir, &e))?;

        Ok(temp_dir)
    }

    /// Create a progress indicator for download reporting
    fn create_progress_indicator() -> ProgressIndicator {
        #[cfg(feature = "cli")]
        {
            let pb = ProgressBar::new(100);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
                    .unwrap()
                    .progress_chars("#>-"),
            );
            ProgressIndicator::Indicatif(pb)
        }
        #[cfg(not(feature = "cli"))]
        {
            ProgressIndicator::NoOp
        }
    }

    /// Download the ONNX weights, returning their SHA-256 hex digest
    async fn download_weights(
        &self,
        base_url: &str,
        download_dir: &Path,
        progress: Option<&ProgressIndicator>,
    ) -> Result<String> {
        let file_url = format!("{}/resolve/main/{MODEL_FILE}", base_url.trim_end_matches('/'));
        let local_path = download_dir.join(MODEL_FILE);

        if let Some(pb) = progress {
            pb.set_message("Downloading model weights".to_string());
        }

        self.download_file(&file_url, &local_path, progress).await?;

        let weights = fs::read(&local_path)
            .map_err(|e| RemovalError::file_io_error("read downloaded weights", &local_path, &e))?;
        Ok(sha256_hex(&weights))
    }

    /// Download a single file with streaming and progress reporting
    async fn download_file(
        &self,
        url: &str,
        local_path: &Path,
        progress: Option<&ProgressIndicator>,
    ) -> Result<()> {
        debug!("Downloading: {url} -> {}", local_path.display());

        if let Some(parent) = local_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| RemovalError::file_io_error("create directory", parent, &e))?;
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RemovalError::network_error(&format!("Failed to download {url}"), e))?;

        if !response.status().is_success() {
            return Err(RemovalError::network_error(
                &format!("HTTP error for {url}"),
                response.status(),
            ));
        }

        let total_size = response.content_length();

        let mut file = tokio::fs::File::create(local_path)
            .await
            .map_err(|e| RemovalError::file_io_error("create file", local_path, &e))?;

        let mut stream = StreamReader::new(
            response
                .bytes_stream()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)),
        );

        let mut downloaded = 0u64;
        let mut buffer = vec![0u8; 8192];

        loop {
            let bytes_read = tokio::io::AsyncReadExt::read(&mut stream, &mut buffer)
                .await
                .map_err(|e| RemovalError::network_error("Failed to read download stream", e))?;

            if bytes_read == 0 {
                break;
            }

            file.write_all(buffer.get(..bytes_read).unwrap_or(&[]))
                .await
                .map_err(|e| RemovalError::file_io_error("write to file", local_path, &e))?;

            downloaded += bytes_read as u64;

            if let Some(pb) = progress {
                if let Some(total) = total_size {
                    pb.set_length(total);
                    pb.set_position(downloaded);
                } else {
                    pb.set_message(format!(
                        "Downloaded {:.1} MB",
                        downloaded as f64 / 1_048_576.0
                    ));
                }
            }
        }

        file.flush()
            .await
            .map_err(|e| RemovalError::file_io_error("flush file", local_path, &e))?;

        debug!("Downloaded {downloaded} bytes to {}", local_path.display());
        Ok(())
    }

    /// Verify a downloaded file against an expected SHA-256 hex digest
    pub fn verify_file_integrity(file_path: &Path, expected_hash: &str) -> Result<()> {
        let data = fs::read(file_path)
            .map_err(|e| RemovalError::file_io_error("read file for verification", file_path, &e))?;
        let actual = sha256_hex(&data);
        if actual.eq_ignore_ascii_case(expected_hash) {
            Ok(())
        } else {
            Err(RemovalError::model(format!(
                "Integrity check failed for '{}': expected {expected_hash}, got {actual}",
                file_path.display()
            )))
        }
    }
}

/// Hex-encoded SHA-256 of a byte slice
fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Validate that a model URL points at a supported repository host
pub fn validate_model_url(url: &str) -> Result<()> {
    if !url.starts_with("https://huggingface.co/") {
        return Err(RemovalError::invalid_config(format!(
            "Unsupported URL format: {url}. Only HuggingFace repositories are supported."
        )));
    }
    let repo_path = url
        .trim_start_matches("https://huggingface.co/")
        .trim_end_matches('/');
    if repo_path.split('/').filter(|s| !s.is_empty()).count() != 2 {
        return Err(RemovalError::invalid_config(format!(
            "Invalid repository URL: {url}. Expected https://huggingface.co/<owner>/<repo>."
        )));
    }
    Ok(())
}
