//! nobg CLI
//!
//! Command-line tool for removing image backgrounds with a pre-built
//! segmentation model.

#[cfg(feature = "cli")]
use std::process::ExitCode;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    nobg::cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
