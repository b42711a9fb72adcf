//! Synthetic inference backend producing random probability tensors
//!
//! Stands in for a real model in tests and in environments without a model
//! artifact. Selection is an explicit configuration choice
//! ([`BackendKind::Synthetic`](crate::BackendKind)); the pipeline never falls
//! back to this backend on a model loading failure.

use crate::config::SegmentationConfig;
use crate::error::{Result, SegmentationError};
use crate::inference::InferenceBackend;
use instant::Duration;
use ndarray::Array4;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Backend producing random but correctly shaped class-probability tensors
#[derive(Debug)]
pub struct SyntheticBackend {
    /// Model input size as (height, width)
    input_size: (u32, u32),
    n_classes: usize,
    /// Fixed seed makes every inference reproducible; None draws from entropy
    seed: Option<u64>,
    initialized: bool,
}

impl SyntheticBackend {
    /// Create a synthetic backend with explicit dimensions
    #[must_use]
    pub fn new(input_size: (u32, u32), n_classes: usize, seed: Option<u64>) -> Self {
        Self {
            input_size,
            n_classes,
            seed,
            initialized: false,
        }
    }

    /// Create a synthetic backend matching a pipeline configuration
    #[must_use]
    pub fn from_config(config: &SegmentationConfig) -> Self {
        Self::new(config.input_size, config.n_classes, config.synthetic_seed)
    }
}

impl InferenceBackend for SyntheticBackend {
    fn initialize(&mut self, _config: &SegmentationConfig) -> Result<Option<Duration>> {
        if self.initialized {
            return Ok(None);
        }
        log::warn!(
            "synthetic inference backend active; output tensors are random, not model predictions"
        );
        self.initialized = true;
        Ok(None)
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        if !self.initialized {
            return Err(SegmentationError::inference("backend not initialized"));
        }

        let (batch, height, width, channels) = input.dim();
        if channels != 3 {
            return Err(SegmentationError::inference(format!(
                "expected 3-channel NHWC input, got {channels} channels"
            )));
        }

        // Seeded runs are reproducible across calls; each call starts from
        // the same stream.
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let n_classes = self.n_classes;
        Ok(Array4::from_shape_fn(
            (batch, height, width, n_classes),
            |_| rng.gen::<f32>(),
        ))
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
