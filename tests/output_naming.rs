//! Integration tests for output path naming
//!
//! One input path produces at most one output path; these tests pin the
//! derivation rule across suffixes, explicit outputs and output directories.

use nobg::{resolve_output_path, DEFAULT_SUFFIX};
use std::path::{Path, PathBuf};

#[test]
fn test_batch_naming_is_collision_free() {
    let inputs = ["shots/a.jpg", "shots/b.png", "shots/c.webp"];
    let outputs: Vec<_> = inputs
        .iter()
        .map(|input| resolve_output_path(Path::new(input), None, None, DEFAULT_SUFFIX))
        .collect();

    assert_eq!(
        outputs,
        vec![
            PathBuf::from("shots/a_nobg.png"),
            PathBuf::from("shots/b_nobg.png"),
            PathBuf::from("shots/c_nobg.png"),
        ]
    );

    let mut deduped = outputs.clone();
    deduped.dedup();
    assert_eq!(deduped.len(), outputs.len());
}

#[test]
fn test_same_stem_different_directories_stay_apart() {
    let first = resolve_output_path(Path::new("a/cat.jpg"), None, None, DEFAULT_SUFFIX);
    let second = resolve_output_path(Path::new("b/cat.jpg"), None, None, DEFAULT_SUFFIX);
    assert_ne!(first, second);
}

#[test]
fn test_output_dir_flattens_batch() {
    let out_dir = Path::new("outputs");
    let first = resolve_output_path(Path::new("a/cat.jpg"), None, Some(out_dir), DEFAULT_SUFFIX);
    let second = resolve_output_path(Path::new("b/dog.jpg"), None, Some(out_dir), DEFAULT_SUFFIX);

    assert_eq!(first, PathBuf::from("outputs/cat_nobg.png"));
    assert_eq!(second, PathBuf::from("outputs/dog_nobg.png"));
}

#[test]
fn test_explicit_output_ignores_suffix_and_dir() {
    let output = resolve_output_path(
        Path::new("photo.jpg"),
        Some(Path::new("final/result.png")),
        Some(Path::new("elsewhere")),
        "_custom",
    );
    assert_eq!(output, PathBuf::from("final/result.png"));
}

#[test]
fn test_empty_suffix_still_changes_extension() {
    let output = resolve_output_path(Path::new("photo.jpg"), None, None, "");
    assert_eq!(output, PathBuf::from("photo.png"));
}

#[test]
fn test_png_input_does_not_overwrite_itself_with_default_suffix() {
    let output = resolve_output_path(Path::new("photo.png"), None, None, DEFAULT_SUFFIX);
    assert_ne!(output, PathBuf::from("photo.png"));
}
