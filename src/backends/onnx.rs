//! ONNX Runtime backend for segmentation models
//!
//! Builds an `ort` session from the configured model artifact with execution
//! provider selection (CUDA, `CoreML`, CPU) and runs NHWC inference. The model
//! is treated as an opaque function from normalized image tensors to
//! per-pixel class-probability tensors.

use crate::config::{ExecutionProvider, SegmentationConfig};
use crate::error::{Result, SegmentationError};
use crate::inference::InferenceBackend;
use instant::{Duration, Instant};
use ndarray::Array4;
use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider as OrtExecutionProvider,
};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;

/// ONNX Runtime backend holding a lazily loaded session
#[derive(Debug)]
pub struct OnnxBackend {
    session: Option<Session>,
    input_size: (u32, u32),
    n_classes: usize,
    initialized: bool,
}

impl OnnxBackend {
    /// Create an uninitialized backend; the session is built on
    /// [`InferenceBackend::initialize`]
    #[must_use]
    pub fn new() -> Self {
        Self {
            session: None,
            input_size: (0, 0),
            n_classes: 0,
            initialized: false,
        }
    }

    fn load_model(&mut self, config: &SegmentationConfig) -> Result<Duration> {
        let load_start = Instant::now();

        if !config.model_path.exists() {
            return Err(SegmentationError::model(format!(
                "model file not found at '{}'",
                config.model_path.display()
            )));
        }

        let mut session_builder = Session::builder()
            .map_err(|e| {
                SegmentationError::model(format!("failed to create session builder: {e}"))
            })?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                SegmentationError::model(format!("failed to set optimization level: {e}"))
            })?;

        session_builder = match config.execution_provider {
            ExecutionProvider::Auto => {
                // Prefer CUDA, then CoreML, with CPU as the implicit fallback
                let mut providers = Vec::new();

                let cuda_provider = CUDAExecutionProvider::default();
                if OrtExecutionProvider::is_available(&cuda_provider).unwrap_or(false) {
                    log::info!("CUDA execution provider is available and will be used");
                    providers.push(cuda_provider.build());
                }

                let coreml_provider = CoreMLExecutionProvider::default();
                if OrtExecutionProvider::is_available(&coreml_provider).unwrap_or(false) {
                    log::info!("CoreML execution provider is available and will be used");
                    providers.push(coreml_provider.build());
                }

                if providers.is_empty() {
                    log::debug!("no hardware acceleration available, using CPU");
                    session_builder
                } else {
                    session_builder
                        .with_execution_providers(providers)
                        .map_err(|e| {
                            SegmentationError::model(format!(
                                "failed to set auto execution providers: {e}"
                            ))
                        })?
                }
            },
            ExecutionProvider::Cpu => {
                log::info!("using CPU execution provider");
                session_builder
            },
            ExecutionProvider::Cuda => {
                let cuda_provider = CUDAExecutionProvider::default();
                if OrtExecutionProvider::is_available(&cuda_provider).unwrap_or(false) {
                    log::info!("using CUDA execution provider");
                    session_builder
                        .with_execution_providers([cuda_provider.build()])
                        .map_err(|e| {
                            SegmentationError::model(format!(
                                "failed to set CUDA execution provider: {e}"
                            ))
                        })?
                } else {
                    log::warn!("CUDA requested but not available, falling back to CPU");
                    session_builder
                }
            },
            ExecutionProvider::CoreMl => {
                let coreml_provider = CoreMLExecutionProvider::default();
                if OrtExecutionProvider::is_available(&coreml_provider).unwrap_or(false) {
                    log::info!("using CoreML execution provider");
                    session_builder
                        .with_execution_providers([coreml_provider.build()])
                        .map_err(|e| {
                            SegmentationError::model(format!(
                                "failed to set CoreML execution provider: {e}"
                            ))
                        })?
                } else {
                    log::warn!("CoreML requested but not available, falling back to CPU");
                    session_builder
                }
            },
        };

        let intra_threads = if config.intra_threads > 0 {
            config.intra_threads
        } else {
            std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .unwrap_or(8)
        };
        let inter_threads = if config.inter_threads > 0 {
            config.inter_threads
        } else {
            (std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .unwrap_or(8)
                / 4)
            .max(1)
        };

        let session = session_builder
            .with_parallel_execution(true)
            .map_err(|e| {
                SegmentationError::model(format!("failed to enable parallel execution: {e}"))
            })?
            .with_intra_threads(intra_threads)
            .map_err(|e| SegmentationError::model(format!("failed to set intra threads: {e}")))?
            .with_inter_threads(inter_threads)
            .map_err(|e| SegmentationError::model(format!("failed to set inter threads: {e}")))?
            .commit_from_file(&config.model_path)
            .map_err(|e| {
                SegmentationError::model(format!(
                    "failed to load model from '{}': {e}",
                    config.model_path.display()
                ))
            })?;

        self.session = Some(session);
        self.input_size = config.input_size;
        self.n_classes = config.n_classes;
        self.initialized = true;

        let load_time = load_start.elapsed();
        log::info!(
            "model loaded from '{}' in {:.0}ms ({intra_threads} intra / {inter_threads} inter threads)",
            config.model_path.display(),
            load_time.as_secs_f64() * 1000.0
        );
        Ok(load_time)
    }
}

impl Default for OnnxBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceBackend for OnnxBackend {
    fn initialize(&mut self, config: &SegmentationConfig) -> Result<Option<Duration>> {
        if self.initialized {
            return Ok(None);
        }
        let load_time = self.load_model(config)?;
        Ok(Some(load_time))
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        if !self.initialized {
            return Err(SegmentationError::inference("backend not initialized"));
        }
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| SegmentationError::inference("ONNX session not initialized"))?;

        let inference_start = Instant::now();
        log::debug!("starting inference with input shape {:?}", input.dim());

        let input_value = Value::from_array(input.clone()).map_err(|e| {
            SegmentationError::inference(format!("failed to convert input tensor: {e}"))
        })?;

        // Positional inputs avoid a dependency on graph tensor names
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| SegmentationError::inference(format!("ONNX inference failed: {e}")))?;

        let output_tensor = {
            let keys: Vec<_> = outputs.keys().collect();
            let first_key = keys
                .first()
                .ok_or_else(|| SegmentationError::inference("no output tensors found"))?;
            outputs
                .get(first_key)
                .ok_or_else(|| SegmentationError::inference("first output tensor not found"))?
                .try_extract_array::<f32>()
                .map_err(|e| {
                    SegmentationError::inference(format!("failed to extract output tensor: {e}"))
                })?
        };

        let output_shape = output_tensor.shape();
        if output_shape.len() != 4 {
            return Err(SegmentationError::inference(format!(
                "expected 4D output tensor, got {}D",
                output_shape.len()
            )));
        }

        let dims = (
            output_shape.first().copied().unwrap_or(1),
            output_shape.get(1).copied().unwrap_or(1),
            output_shape.get(2).copied().unwrap_or(1),
            output_shape.get(3).copied().unwrap_or(1),
        );
        let output_data = output_tensor.view().to_owned();
        let result = Array4::from_shape_vec(dims, output_data.into_raw_vec_and_offset().0)
            .map_err(|e| {
                SegmentationError::inference(format!("failed to reshape output tensor: {e}"))
            })?;

        log::debug!(
            "inference complete in {:.2}ms",
            inference_start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(result)
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        let (height, width) = self.input_size;
        (1, height as usize, width as usize, 3)
    }

    fn output_shape(&self) -> (usize, usize, usize, usize) {
        let (height, width) = self.input_size;
        (1, height as usize, width as usize, self.n_classes)
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_model_unavailable() {
        let mut backend = OnnxBackend::new();
        let mut config = SegmentationConfig::default();
        config.model_path = "/nonexistent/model.onnx".into();

        let err = backend.initialize(&config).unwrap_err();
        assert!(matches!(err, SegmentationError::ModelUnavailable(_)));
        assert!(err.to_string().contains("/nonexistent/model.onnx"));
        assert!(!backend.is_initialized());
    }

    #[test]
    fn test_uninitialized_inference_rejected() {
        let mut backend = OnnxBackend::new();
        let input = Array4::<f32>::zeros((1, 4, 4, 3));
        assert!(matches!(
            backend.infer(&input),
            Err(SegmentationError::Inference(_))
        ));
    }
}
