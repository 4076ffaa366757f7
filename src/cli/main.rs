//! Command-line interface for background removal
//!
//! Parses arguments, resolves the input file list, runs each file through
//! the removal pipeline and reports per-file status plus a batch summary.

use crate::{
    backends::TractBackend,
    cache::{format_size, ModelCache},
    config::RemovalConfig,
    download::ModelDownloader,
    models::{ModelManager, ModelProfile},
    postprocess::InvertOptions,
    processor::BackgroundRemover,
    services::{resolve_output_path, DEFAULT_SUFFIX},
    tracing_config::{TracingConfig, TracingFormat},
};
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{info, warn};

/// Remove backgrounds from images using a pre-built segmentation model
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "nobg")]
#[command(after_help = "\
Examples:
  nobg input.jpg                    # Creates input_nobg.png
  nobg input.jpg -o output.png      # Specify output file
  nobg input.jpg --fast             # Use faster model profile
  nobg '*.jpg' --output-dir out     # Process multiple files into a directory
  nobg sketch.png --dark-mode       # Invert dark colors for dark-mode hosts")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image file(s) or glob pattern(s) to process (JPG, PNG, etc.)
    #[arg(value_name = "INPUT", required_unless_present_any = &["only_download", "list_models", "clear_cache"])]
    pub input: Vec<String>,

    /// Output file path (only valid for a single input file)
    #[arg(short, long, value_name = "PATH", conflicts_with = "output_dir")]
    pub output: Option<PathBuf>,

    /// Directory to place outputs into (created if missing)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Suffix added to the output filename (default: _nobg)
    #[arg(long, default_value = DEFAULT_SUFFIX)]
    pub suffix: String,

    /// Use the fast model profile (faster but less accurate)
    #[arg(long)]
    pub fast: bool,

    /// Copy the resulting image to the system clipboard
    #[cfg(feature = "clipboard")]
    #[arg(long)]
    pub clipboard: bool,

    /// Invert dark colors for better visibility in dark mode (e.g. Obsidian)
    #[arg(long)]
    pub dark_mode: bool,

    /// Brightness threshold for dark color inversion, 0-255
    #[arg(long, value_name = "N", default_value_t = 128)]
    pub invert_threshold: u8,

    /// Brightness multiplier for inverted colors
    #[arg(long, value_name = "F", default_value_t = 1.2)]
    pub brightness_boost: f32,

    /// Suppress success messages and the summary
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable verbose logging (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Download the model into the cache and exit
    #[arg(long)]
    pub only_download: bool,

    /// List cached models and exit
    #[arg(long)]
    pub list_models: bool,

    /// Clear cached models and exit
    #[arg(long)]
    pub clear_cache: bool,

    /// Use a custom model cache directory
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,
}

impl Cli {
    /// Model profile selected by the flags
    #[must_use]
    pub fn model_profile(&self) -> ModelProfile {
        if self.fast {
            ModelProfile::Fast
        } else {
            ModelProfile::Base
        }
    }

    /// Build the removal configuration from the flags
    pub fn removal_config(&self) -> Result<RemovalConfig> {
        let mut builder = RemovalConfig::builder()
            .model(self.model_profile())
            .debug(self.verbose >= 2);

        if self.dark_mode {
            builder = builder.invert(InvertOptions {
                threshold: self.invert_threshold,
                brightness_boost: self.brightness_boost,
            });
        }

        builder.build().context("Invalid configuration")
    }

    /// The cache selected by `--cache-dir`, or the default one
    fn model_cache(&self) -> Result<ModelCache> {
        let cache = match &self.cache_dir {
            Some(dir) => ModelCache::with_custom_cache_dir(dir)
                .context("Failed to create cache with custom directory")?,
            None => ModelCache::new().context("Failed to create model cache")?,
        };
        Ok(cache)
    }
}

/// CLI entry point
pub async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing(cli.verbose).context("Failed to initialize tracing")?;

    if cli.list_models {
        list_cached_models(&cli)?;
        return Ok(ExitCode::SUCCESS);
    }

    if cli.clear_cache {
        clear_cached_models(&cli)?;
        return Ok(ExitCode::SUCCESS);
    }

    if cli.only_download {
        download_model_only(&cli).await?;
        return Ok(ExitCode::SUCCESS);
    }

    // Resolve the input file list before validating --output
    let files = expand_inputs(&cli.input)?;
    validate_output_flags(&cli, files.len())?;

    if let Some(ref dir) = cli.output_dir {
        prepare_output_dir(dir)?;
    }

    let cache = cli.model_cache()?;
    ensure_model_available(&cli, cache.clone()).await?;

    let config = cli.removal_config()?;
    let manager = ModelManager::with_cache(cli.model_profile(), cache);
    let mut remover =
        BackgroundRemover::with_backend(config, Box::new(TractBackend::new(manager)));

    let start_time = Instant::now();
    let (succeeded, total) = process_files(&cli, &files, &mut remover);

    info!(
        "Processed {succeeded}/{total} image(s) in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    if total > 1 && !cli.quiet {
        println!("\nProcessed {succeeded}/{total} images successfully");
    }

    if succeeded == total {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Initialize tracing based on verbosity level and environment
fn init_tracing(verbose_count: u8) -> Result<()> {
    TracingConfig::new()
        .with_verbosity(verbose_count)
        .with_format(TracingFormat::from_env())
        .init()
        .context("Failed to initialize tracing subscriber")
}

/// Expand positional inputs, resolving glob patterns
///
/// Literal paths pass through untouched even when missing, so the per-file
/// loop reports them as failures instead of silently dropping them. Glob
/// patterns that match nothing produce a warning.
fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if input.contains(['*', '?', '[']) {
            let matches = glob::glob(input)
                .with_context(|| format!("Invalid glob pattern: {input}"))?
                .filter_map(std::result::Result::ok)
                .filter(|path| path.is_file())
                .collect::<Vec<_>>();

            if matches.is_empty() {
                warn!("Pattern matched no files: {input}");
            }
            files.extend(matches);
        } else {
            files.push(PathBuf::from(input));
        }
    }

    // Alphanumeric order for a stable processing sequence
    files.sort();
    files.dedup();
    Ok(files)
}

/// Argument errors that depend on the resolved file list, checked before
/// any processing starts
fn validate_output_flags(cli: &Cli, file_count: usize) -> Result<()> {
    if file_count == 0 {
        anyhow::bail!("No input files matched");
    }
    if cli.output.is_some() && file_count > 1 {
        anyhow::bail!("--output can only be used with a single input file");
    }
    Ok(())
}

/// Create the output directory if needed, rejecting paths that are files
fn prepare_output_dir(dir: &Path) -> Result<()> {
    if dir.is_file() {
        anyhow::bail!(
            "Output path exists and is a file, not a directory: {}",
            dir.display()
        );
    }
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }
    Ok(())
}

/// Auto-download the model when it is not cached yet
async fn ensure_model_available(cli: &Cli, cache: ModelCache) -> Result<()> {
    let profile = cli.model_profile();

    if cache.is_model_cached(profile.model_id()) {
        return Ok(());
    }

    if !cli.quiet {
        println!("📦 Model not cached. Downloading {} ...", profile.model_id());
    }

    let downloader =
        ModelDownloader::with_cache(cache).context("Failed to create model downloader")?;
    downloader
        .download_model(profile.repository_url(), !cli.quiet)
        .await
        .context("Failed to download model")?;

    Ok(())
}

/// Process every file, returning (succeeded, total)
fn process_files(cli: &Cli, files: &[PathBuf], remover: &mut BackgroundRemover) -> (usize, usize) {
    let total = files.len();
    let mut succeeded = 0;

    let progress = if total > 1 && !cli.quiet {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap()
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    for input_file in files {
        if let Some(ref pb) = progress {
            pb.set_message(format!("Processing {}", input_file.display()));
        }

        let output_file = resolve_output_path(
            input_file,
            cli.output.as_deref(),
            cli.output_dir.as_deref(),
            &cli.suffix,
        );

        if !cli.quiet {
            println!(
                "Processing: {} -> {}",
                input_file.display(),
                output_file.display()
            );
        }

        match process_one(cli, remover, input_file, &output_file) {
            Ok(()) => {
                succeeded += 1;
                if !cli.quiet {
                    println!("✓ Successfully processed: {}", input_file.display());
                }
            },
            Err(e) => {
                eprintln!("Error: {e:#}");
                if !cli.quiet {
                    println!("✗ Failed to process: {}", input_file.display());
                }
            },
        }

        if let Some(ref pb) = progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    (succeeded, total)
}

/// Run the pipeline for one file: process, save, optionally copy
fn process_one(
    cli: &Cli,
    remover: &mut BackgroundRemover,
    input_file: &Path,
    output_file: &Path,
) -> Result<()> {
    let result = remover
        .process_file(input_file)
        .with_context(|| format!("Failed to process {}", input_file.display()))?;

    result
        .save_png(output_file)
        .with_context(|| format!("Failed to save {}", output_file.display()))?;

    #[cfg(feature = "clipboard")]
    if cli.clipboard {
        crate::clipboard::copy_image_to_clipboard(&result.image)
            .context("Failed to copy result to clipboard")?;
        if !cli.quiet {
            println!("📋 Copied to clipboard");
        }
    }

    #[cfg(not(feature = "clipboard"))]
    let _ = cli;

    Ok(())
}

/// List cached models and their sizes
fn list_cached_models(cli: &Cli) -> Result<()> {
    let cache = cli.model_cache()?;
    let models = cache
        .scan_cached_models()
        .context("Failed to list cached models")?;

    println!("📦 Cached models ({})", cache.cache_dir().display());

    if models.is_empty() {
        println!("No cached models found.");
        println!("\n💡 To download the default model:");
        println!("  nobg --only-download");
        return Ok(());
    }

    for model in models {
        let status = if model.has_weights {
            "✅ complete"
        } else {
            "❌ missing weights"
        };
        println!(
            "  • {} ({}, {status})",
            model.model_id,
            format_size(model.size_bytes)
        );
    }

    Ok(())
}

/// Clear cached models
fn clear_cached_models(cli: &Cli) -> Result<()> {
    let cache = cli.model_cache()?;
    let removed = cache.clear_all_models().context("Failed to clear cache")?;

    if removed.is_empty() {
        println!("💡 Cache was already empty");
    } else {
        println!("✅ Removed {} model(s):", removed.len());
        for model_id in &removed {
            println!("  • {model_id}");
        }
    }
    println!("Cache location: {}", cache.cache_dir().display());

    Ok(())
}

/// Download the model without processing anything
async fn download_model_only(cli: &Cli) -> Result<()> {
    let profile = cli.model_profile();
    let cache = cli.model_cache()?;

    println!("📦 Downloading model from: {}", profile.repository_url());

    let downloader =
        ModelDownloader::with_cache(cache).context("Failed to create model downloader")?;
    let model_id = downloader
        .download_model(profile.repository_url(), true)
        .await
        .context("Failed to download model")?;

    println!("✅ Successfully downloaded model!");
    println!(
        "   Cache location: {}",
        downloader.cache().model_path(&model_id).display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_flags() {
        let cli = parse(&["nobg", "input.jpg"]);
        assert_eq!(cli.input, vec!["input.jpg"]);
        assert_eq!(cli.suffix, "_nobg");
        assert_eq!(cli.invert_threshold, 128);
        assert!((cli.brightness_boost - 1.2).abs() < f32::EPSILON);
        assert!(!cli.fast);
        assert!(!cli.quiet);
        assert_eq!(cli.model_profile(), ModelProfile::Base);
    }

    #[test]
    fn test_fast_selects_fast_profile() {
        let cli = parse(&["nobg", "input.jpg", "--fast"]);
        assert_eq!(cli.model_profile(), ModelProfile::Fast);
    }

    #[test]
    fn test_input_required_without_cache_flags() {
        assert!(Cli::try_parse_from(["nobg"]).is_err());
        assert!(Cli::try_parse_from(["nobg", "--list-models"]).is_ok());
        assert!(Cli::try_parse_from(["nobg", "--clear-cache"]).is_ok());
        assert!(Cli::try_parse_from(["nobg", "--only-download"]).is_ok());
    }

    #[test]
    fn test_output_flag_requires_single_input() {
        let cli = parse(&["nobg", "a.jpg", "b.jpg", "-o", "out.png"]);
        assert!(validate_output_flags(&cli, 2).is_err());

        let cli = parse(&["nobg", "a.jpg", "-o", "out.png"]);
        assert!(validate_output_flags(&cli, 1).is_ok());
    }

    #[test]
    fn test_empty_file_list_rejected_before_processing() {
        let cli = parse(&["nobg", "*.jpg"]);
        assert!(validate_output_flags(&cli, 0).is_err());
    }

    #[test]
    fn test_output_conflicts_with_output_dir() {
        let result =
            Cli::try_parse_from(["nobg", "in.jpg", "-o", "out.png", "--output-dir", "outs"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_dark_mode_config() {
        let cli = parse(&[
            "nobg",
            "input.jpg",
            "--dark-mode",
            "--invert-threshold",
            "96",
            "--brightness-boost",
            "1.5",
        ]);
        let config = cli.removal_config().unwrap();
        let invert = config.invert.unwrap();
        assert_eq!(invert.threshold, 96);
        assert!((invert.brightness_boost - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_no_dark_mode_means_no_inversion() {
        let cli = parse(&["nobg", "input.jpg", "--invert-threshold", "96"]);
        let config = cli.removal_config().unwrap();
        assert!(config.invert.is_none());
    }

    #[test]
    fn test_invalid_brightness_boost_rejected_at_build() {
        let cli = parse(&["nobg", "input.jpg", "--dark-mode", "--brightness-boost", "0"]);
        assert!(cli.removal_config().is_err());
    }

    #[test]
    fn test_expand_inputs_keeps_missing_literals() {
        let files = expand_inputs(&["missing_file.jpg".to_string()]).unwrap();
        assert_eq!(files, vec![PathBuf::from("missing_file.jpg")]);
    }

    #[test]
    fn test_expand_inputs_glob_and_sort() {
        let temp = tempfile::TempDir::new().unwrap();
        for name in ["z.jpg", "a.jpg", "m.jpg", "skip.txt"] {
            std::fs::write(temp.path().join(name), b"x").unwrap();
        }

        let pattern = temp.path().join("*.jpg").display().to_string();
        let files = expand_inputs(&[pattern]).unwrap();

        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "m.jpg", "z.jpg"]);
    }

    #[test]
    fn test_expand_inputs_deduplicates() {
        let files = expand_inputs(&["a.jpg".to_string(), "a.jpg".to_string()]).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_prepare_output_dir() {
        let temp = tempfile::TempDir::new().unwrap();

        let dir = temp.path().join("outputs");
        prepare_output_dir(&dir).unwrap();
        assert!(dir.is_dir());

        let file = temp.path().join("collision");
        std::fs::write(&file, b"x").unwrap();
        assert!(prepare_output_dir(&file).is_err());
    }
}
