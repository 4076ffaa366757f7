//! Inference backend implementations
//!
//! One backend ships: Tract, a pure Rust ONNX inference engine with no
//! external dependencies. The model itself is treated as a black box.

pub mod tract;

pub use tract::TractBackend;
