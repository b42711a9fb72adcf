//! Inference backend implementations

#[cfg(feature = "onnx")]
pub mod onnx;
pub mod synthetic;

#[cfg(feature = "onnx")]
pub use onnx::OnnxBackend;
pub use synthetic::SyntheticBackend;
