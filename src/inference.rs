//! Inference backend abstraction and factory

use crate::backends::SyntheticBackend;
use crate::config::{BackendKind, SegmentationConfig};
use crate::error::Result;
use instant::Duration;
use ndarray::Array4;

#[cfg(not(feature = "onnx"))]
use crate::error::SegmentationError;

/// Trait for inference backends
///
/// The boundary contract: input is a batched NHWC tensor of shape
/// (1, height, width, 3) in `[0.0, 1.0]`; output is a batched per-pixel
/// class-probability tensor of shape (1, height, width, `n_classes`). The
/// pipeline reads only the first batch element and assumes higher value =
/// higher class likelihood; no value range is enforced on the output.
pub trait InferenceBackend: Send {
    /// Load the underlying model, returning the load time if work was done
    ///
    /// Called at most once per backend instance; repeated calls are no-ops.
    ///
    /// # Errors
    /// - `ModelUnavailable` when the model artifact is missing or invalid
    fn initialize(&mut self, config: &SegmentationConfig) -> Result<Option<Duration>>;

    /// Run inference on the input tensor
    ///
    /// # Errors
    /// - `Inference` when the backend is not initialized or the model run fails
    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>>;

    /// Expected input shape (1, height, width, 3)
    fn input_shape(&self) -> (usize, usize, usize, usize);

    /// Expected output shape (1, height, width, `n_classes`)
    fn output_shape(&self) -> (usize, usize, usize, usize);

    /// Check if the backend has loaded its model
    fn is_initialized(&self) -> bool;
}

/// Factory trait for creating inference backends
///
/// The injection seam: production code uses [`DefaultBackendFactory`], tests
/// inject deterministic backends through this trait.
pub trait BackendFactory: Send + Sync {
    /// Create an uninitialized backend of the requested kind
    ///
    /// # Errors
    ///
    /// Returns `ModelUnavailable` when the requested kind is not compiled in.
    fn create_backend(
        &self,
        kind: BackendKind,
        config: &SegmentationConfig,
    ) -> Result<Box<dyn InferenceBackend>>;

    /// List backend kinds this factory can build
    fn available_backends(&self) -> Vec<BackendKind>;
}

/// Default factory building the ONNX and synthetic backends
pub struct DefaultBackendFactory;

impl BackendFactory for DefaultBackendFactory {
    fn create_backend(
        &self,
        kind: BackendKind,
        config: &SegmentationConfig,
    ) -> Result<Box<dyn InferenceBackend>> {
        match kind {
            BackendKind::Onnx => {
                #[cfg(feature = "onnx")]
                {
                    Ok(Box::new(crate::backends::OnnxBackend::new()))
                }
                #[cfg(not(feature = "onnx"))]
                {
                    Err(SegmentationError::model(
                        "ONNX backend requested but the crate was built without the 'onnx' feature",
                    ))
                }
            },
            BackendKind::Synthetic => Ok(Box::new(SyntheticBackend::from_config(config))),
        }
    }

    fn available_backends(&self) -> Vec<BackendKind> {
        #[cfg(feature = "onnx")]
        {
            vec![BackendKind::Onnx, BackendKind::Synthetic]
        }
        #[cfg(not(feature = "onnx"))]
        {
            vec![BackendKind::Synthetic]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_builds_synthetic_backend() {
        let config = SegmentationConfig::default();
        let backend = DefaultBackendFactory
            .create_backend(BackendKind::Synthetic, &config)
            .unwrap();
        assert!(!backend.is_initialized());
        let (height, width) = config.input_size;
        assert_eq!(
            backend.input_shape(),
            (1, height as usize, width as usize, 3)
        );
        assert_eq!(
            backend.output_shape(),
            (1, height as usize, width as usize, config.n_classes)
        );
    }

    #[test]
    fn test_factory_lists_synthetic() {
        assert!(DefaultBackendFactory
            .available_backends()
            .contains(&BackendKind::Synthetic));
    }
}
