//! Output path derivation
//!
//! One input path produces at most one output path. Without an explicit
//! `--output`, the output lands next to the input as `<stem><suffix>.png`;
//! `--output-dir` redirects it into another directory with the same derived
//! name. The extension is always `.png` since the result carries an alpha
//! channel.

use std::path::{Path, PathBuf};

/// Default suffix appended to the input stem
pub const DEFAULT_SUFFIX: &str = "_nobg";

/// Resolve the output path for one input file
///
/// Precedence: `explicit` wins outright, then `output_dir` + derived name,
/// then the input's own directory + derived name.
#[must_use]
pub fn resolve_output_path(
    input: &Path,
    explicit: Option<&Path>,
    output_dir: Option<&Path>,
    suffix: &str,
) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = format!("{stem}{suffix}.png");

    match output_dir {
        Some(dir) => dir.join(file_name),
        None => input
            .parent()
            .map_or_else(|| PathBuf::from(&file_name), |parent| parent.join(&file_name)),
    }
}
