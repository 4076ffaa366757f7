//! On-disk cache for downloaded model weights
//!
//! Models live under the platform cache directory
//! (`~/.cache/nobg/models/<model-id>/` on Linux), overridable with the
//! `NOBG_CACHE_DIR` environment variable or the `--cache-dir` CLI flag.
//! Each cached model directory contains the ONNX weights plus a
//! `metadata.json` describing where and when it was fetched.

use crate::error::{RemovalError, Result};
use crate::models::MODEL_FILE;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the cache location
pub const CACHE_DIR_ENV: &str = "NOBG_CACHE_DIR";

/// Name of the per-model metadata file
pub const METADATA_FILE: &str = "metadata.json";

/// Provenance record written next to downloaded weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Repository URL the model was fetched from
    pub source_url: String,
    /// SHA-256 of the ONNX weights, hex encoded
    pub sha256: String,
    /// Download timestamp
    pub downloaded_at: DateTime<Utc>,
}

/// Summary of one cached model directory
#[derive(Debug, Clone)]
pub struct CachedModelInfo {
    /// Model identifier (directory name)
    pub model_id: String,
    /// Absolute path of the model directory
    pub path: PathBuf,
    /// Total size of the directory in bytes
    pub size_bytes: u64,
    /// Whether the ONNX weights are present
    pub has_weights: bool,
    /// Whether the metadata file is present
    pub has_metadata: bool,
}

/// Cache of downloaded models
#[derive(Debug, Clone)]
pub struct ModelCache {
    cache_dir: PathBuf,
}

impl ModelCache {
    /// Create a cache rooted at the default platform location
    pub fn new() -> Result<Self> {
        let base = if let Ok(custom) = std::env::var(CACHE_DIR_ENV) {
            PathBuf::from(custom)
        } else {
            dirs::cache_dir()
                .ok_or_else(|| {
                    RemovalError::model("Could not determine platform cache directory")
                })?
                .join("nobg")
        };

        Self::at_base_dir(&base)
    }

    /// Create a cache rooted at a custom base directory
    pub fn with_custom_cache_dir(base: &Path) -> Result<Self> {
        Self::at_base_dir(base)
    }

    fn at_base_dir(base: &Path) -> Result<Self> {
        let cache_dir = base.join("models");
        fs::create_dir_all(&cache_dir)
            .map_err(|e| RemovalError::file_io_error("create cache directory", &cache_dir, &e))?;
        Ok(Self { cache_dir })
    }

    /// Convert a repository URL into a cache directory name
    ///
    /// `https://huggingface.co/imgly/isnet-general-onnx` becomes
    /// `imgly--isnet-general-onnx`.
    #[must_use]
    pub fn url_to_model_id(url: &str) -> String {
        url.trim_end_matches('/')
            .rsplit("huggingface.co/")
            .next()
            .unwrap_or(url)
            .replace('/', "--")
    }

    /// Whether the given model's weights are present in the cache
    #[must_use]
    pub fn is_model_cached(&self, model_id: &str) -> bool {
        self.model_path(model_id).join(MODEL_FILE).exists()
    }

    /// Directory a model is (or would be) cached in
    #[must_use]
    pub fn model_path(&self, model_id: &str) -> PathBuf {
        self.cache_dir.join(model_id)
    }

    /// Root directory of the cache
    #[must_use]
    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    /// Read the metadata record for a cached model, if present
    pub fn read_metadata(&self, model_id: &str) -> Result<Option<ModelMetadata>> {
        let path = self.model_path(model_id).join(METADATA_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&path)
            .map_err(|e| RemovalError::file_io_error("read model metadata", &path, &e))?;
        let metadata = serde_json::from_str(&data)
            .map_err(|e| RemovalError::model(format!("Invalid model metadata: {e}")))?;
        Ok(Some(metadata))
    }

    /// Write the metadata record for a cached model
    pub fn write_metadata(&self, model_id: &str, metadata: &ModelMetadata) -> Result<()> {
        let path = self.model_path(model_id).join(METADATA_FILE);
        let data = serde_json::to_string_pretty(metadata)
            .map_err(|e| RemovalError::model(format!("Failed to serialize metadata: {e}")))?;
        fs::write(&path, data)
            .map_err(|e| RemovalError::file_io_error("write model metadata", &path, &e))
    }

    /// List all cached models with their sizes and completeness
    pub fn scan_cached_models(&self) -> Result<Vec<CachedModelInfo>> {
        let mut models = Vec::new();

        let entries = fs::read_dir(&self.cache_dir).map_err(|e| {
            RemovalError::file_io_error("read cache directory", &self.cache_dir, &e)
        })?;

        for entry in entries {
            let entry = entry
                .map_err(|e| RemovalError::file_io_error("read cache entry", &self.cache_dir, &e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let model_id = entry.file_name().to_string_lossy().into_owned();
            models.push(CachedModelInfo {
                has_weights: path.join(MODEL_FILE).exists(),
                has_metadata: path.join(METADATA_FILE).exists(),
                size_bytes: dir_size(&path),
                model_id,
                path,
            });
        }

        models.sort_by(|a, b| a.model_id.cmp(&b.model_id));
        Ok(models)
    }

    /// Remove every cached model, returning the removed ids
    pub fn clear_all_models(&self) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for model in self.scan_cached_models()? {
            fs::remove_dir_all(&model.path).map_err(|e| {
                RemovalError::file_io_error("remove cached model", &model.path, &e)
            })?;
            removed.push(model.model_id);
        }
        Ok(removed)
    }

    /// Remove one cached model; returns false when it was not cached
    pub fn clear_specific_model(&self, model_id: &str) -> Result<bool> {
        let path = self.model_path(model_id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&path)
            .map_err(|e| RemovalError::file_io_error("remove cached model", &path, &e))?;
        Ok(true)
    }
}

/// Recursive directory size; unreadable entries count as zero
fn dir_size(path: &Path) -> u64 {
    let Ok(entries) = fs::read_dir(path) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                dir_size(&path)
            } else {
                entry.metadata().map(|m| m.len()).unwrap_or(0)
            }
        })
        .sum()
}

/// Format a byte count for humans (e.g. "168.75 MB")
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.2} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_cache() -> (TempDir, ModelCache) {
        let temp = TempDir::new().unwrap();
        let cache = ModelCache::with_custom_cache_dir(temp.path()).unwrap();
        (temp, cache)
    }

    #[test]
    fn test_url_to_model_id() {
        assert_eq!(
            ModelCache::url_to_model_id("https://huggingface.co/imgly/isnet-general-onnx"),
            "imgly--isnet-general-onnx"
        );
        assert_eq!(
            ModelCache::url_to_model_id("https://huggingface.co/imgly/isnet-general-onnx/"),
            "imgly--isnet-general-onnx"
        );
    }

    #[test]
    fn test_env_override_sets_cache_root() {
        let temp = TempDir::new().unwrap();
        std::env::set_var(CACHE_DIR_ENV, temp.path());
        let cache = ModelCache::new().unwrap();
        std::env::remove_var(CACHE_DIR_ENV);

        assert_eq!(cache.cache_dir(), &temp.path().join("models"));
        assert!(cache.cache_dir().is_dir());
    }

    #[test]
    fn test_empty_cache_scan() {
        let (_temp, cache) = test_cache();
        assert!(cache.scan_cached_models().unwrap().is_empty());
        assert!(!cache.is_model_cached("imgly--isnet-general-onnx"));
    }

    #[test]
    fn test_cached_model_detection() {
        let (_temp, cache) = test_cache();
        let model_dir = cache.model_path("test--model").join("onnx");
        fs::create_dir_all(&model_dir).unwrap();
        fs::write(model_dir.join("model.onnx"), b"weights").unwrap();

        assert!(cache.is_model_cached("test--model"));

        let models = cache.scan_cached_models().unwrap();
        assert_eq!(models.len(), 1);
        assert!(models[0].has_weights);
        assert!(!models[0].has_metadata);
        assert!(models[0].size_bytes > 0);
    }

    #[test]
    fn test_metadata_round_trip() {
        let (_temp, cache) = test_cache();
        fs::create_dir_all(cache.model_path("test--model")).unwrap();

        let metadata = ModelMetadata {
            source_url: "https://huggingface.co/test/model".to_string(),
            sha256: "abc123".to_string(),
            downloaded_at: Utc::now(),
        };
        cache.write_metadata("test--model", &metadata).unwrap();

        let read_back = cache.read_metadata("test--model").unwrap().unwrap();
        assert_eq!(read_back.source_url, metadata.source_url);
        assert_eq!(read_back.sha256, "abc123");
    }

    #[test]
    fn test_clear_models() {
        let (_temp, cache) = test_cache();
        let model_dir = cache.model_path("a--model").join("onnx");
        fs::create_dir_all(&model_dir).unwrap();
        fs::write(model_dir.join("model.onnx"), b"weights").unwrap();

        assert!(!cache.clear_specific_model("missing--model").unwrap());
        assert!(cache.clear_specific_model("a--model").unwrap());
        assert!(cache.scan_cached_models().unwrap().is_empty());

        let removed = cache.clear_all_models().unwrap();
        assert!(removed.is_empty());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(176_947_200), "168.75 MB");
    }
}
