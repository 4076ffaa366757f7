//! File-facing services: image I/O and output path derivation

pub mod io;
pub mod output;

pub use io::{is_supported_image, load_image, SUPPORTED_EXTENSIONS};
pub use output::{resolve_output_path, DEFAULT_SUFFIX};
