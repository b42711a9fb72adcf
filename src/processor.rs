//! Unified segmentation processor
//!
//! [`SegmentationProcessor`] owns every pipeline stage and the lazily
//! initialized inference backend, and runs the full
//! decode → preprocess → infer → label → colorize/encode + stats flow for
//! one request.

use crate::config::SegmentationConfig;
use crate::decoder::ImageDecoder;
use crate::encoder::ImageEncoder;
use crate::error::{Result, SegmentationError};
use crate::inference::{BackendFactory, DefaultBackendFactory, InferenceBackend};
use crate::postprocess::{Colorizer, LabelMapper};
use crate::preprocess::Preprocessor;
use crate::stats::StatsCalculator;
use crate::types::{ProcessingTimings, SegmentationResult};
use instant::{Duration, Instant};
use ndarray::{Array4, Axis};
use std::sync::Mutex;
use tracing::instrument;

/// Stateless-per-request segmentation pipeline with a process-lifetime model
///
/// The inference backend is loaded at most once, on first use, under a mutex
/// guarding the check-and-initialize sequence; concurrent first requests
/// cannot race the load or observe a partially initialized handle. The same
/// mutex serializes inference invocations, since the backend requires
/// exclusive access while running.
pub struct SegmentationProcessor {
    config: SegmentationConfig,
    factory: Box<dyn BackendFactory>,
    backend: Mutex<Option<Box<dyn InferenceBackend>>>,
    decoder: ImageDecoder,
    preprocessor: Preprocessor,
    mapper: LabelMapper,
    colorizer: Colorizer,
    stats: StatsCalculator,
}

impl std::fmt::Debug for SegmentationProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentationProcessor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SegmentationProcessor {
    /// Create a processor with the default backend factory
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::InvalidConfig` when the configuration's
    /// class count, palette, and names are inconsistent.
    pub fn new(config: SegmentationConfig) -> Result<Self> {
        Self::with_factory(config, Box::new(DefaultBackendFactory))
    }

    /// Create a processor with an injected backend factory
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::InvalidConfig` for inconsistent
    /// configurations.
    pub fn with_factory(
        config: SegmentationConfig,
        factory: Box<dyn BackendFactory>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            decoder: ImageDecoder::new(),
            preprocessor: Preprocessor::new(config.input_size),
            mapper: LabelMapper::new(config.n_classes),
            colorizer: Colorizer::new(config.palette.clone()),
            stats: StatsCalculator::new(config.class_names.clone()),
            backend: Mutex::new(None),
            factory,
            config,
        })
    }

    /// The active configuration
    #[must_use]
    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Force the lazy model load, e.g. for a readiness probe at startup
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::ModelUnavailable` when the model artifact
    /// cannot be loaded.
    pub fn initialize(&self) -> Result<()> {
        self.infer_locked(None)?;
        Ok(())
    }

    /// Whether the inference backend has been loaded
    ///
    /// Reports state without triggering the load.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.backend
            .lock()
            .map(|guard| {
                guard
                    .as_ref()
                    .map_or(false, |backend| backend.is_initialized())
            })
            .unwrap_or(false)
    }

    /// Lock the backend slot, initializing it on first access, and run the
    /// given input if any. The lock is held across the inference call;
    /// `ort` sessions need exclusive access, so invocation is serialized.
    fn infer_locked(
        &self,
        input: Option<&Array4<f32>>,
    ) -> Result<(Option<Array4<f32>>, Option<Duration>)> {
        let mut guard = self
            .backend
            .lock()
            .map_err(|_| SegmentationError::internal("inference backend mutex poisoned"))?;

        let load_time = if guard.is_none() {
            let mut backend = self
                .factory
                .create_backend(self.config.backend, &self.config)?;
            let load_time = backend.initialize(&self.config)?;
            *guard = Some(backend);
            load_time
        } else {
            None
        };

        let output = match input {
            Some(tensor) => {
                let backend = guard
                    .as_mut()
                    .ok_or_else(|| SegmentationError::internal("inference backend missing"))?;
                Some(backend.infer(tensor)?)
            },
            None => None,
        };
        Ok((output, load_time))
    }

    /// Run the full pipeline on encoded image bytes
    ///
    /// Any stage failure short-circuits: no partial color map or statistics
    /// are returned.
    ///
    /// # Errors
    ///
    /// - `Decode` / `EmptyImage` for malformed or zero-area input
    /// - `Preprocess` when tensor conversion fails
    /// - `ModelUnavailable` when the first request cannot load the model
    /// - `Inference` when the model run fails
    /// - `ShapeMismatch` / `PaletteIndex` for configuration inconsistencies
    /// - `Encode` when PNG serialization fails
    #[instrument(skip_all, fields(input_bytes = bytes.len()))]
    pub fn process(&self, bytes: &[u8]) -> Result<SegmentationResult> {
        let total_start = Instant::now();

        let decode_start = Instant::now();
        let image = self.decoder.decode(bytes)?;
        let decode_ms = decode_start.elapsed().as_millis() as u64;
        tracing::debug!(
            width = image.width(),
            height = image.height(),
            "decoded input image"
        );

        let preprocess_start = Instant::now();
        let input = self.preprocessor.prepare(&image)?;
        let preprocess_ms = preprocess_start.elapsed().as_millis() as u64;

        let inference_start = Instant::now();
        let (output, model_load_time) = self.infer_locked(Some(&input))?;
        let output =
            output.ok_or_else(|| SegmentationError::internal("inference produced no output"))?;
        let inference_ms = inference_start.elapsed().as_millis() as u64;

        if output.dim().0 == 0 {
            return Err(SegmentationError::inference(
                "inference returned an empty batch",
            ));
        }

        let postprocess_start = Instant::now();
        let probabilities = output.index_axis(Axis(0), 0);
        let labels = self.mapper.map(&probabilities)?;
        let color_map = self.colorizer.colorize(&labels)?;
        let stats = self.stats.calculate(&labels)?;
        let postprocess_ms = postprocess_start.elapsed().as_millis() as u64;

        let encode_start = Instant::now();
        let png_data = ImageEncoder::encode_png(&color_map)?;
        let encode_ms = encode_start.elapsed().as_millis() as u64;

        let (height, width) = labels.dim();
        let timings = ProcessingTimings {
            decode_ms,
            preprocess_ms,
            model_load_ms: model_load_time.map(|d| d.as_millis() as u64),
            inference_ms,
            postprocess_ms,
            encode_ms,
            total_ms: total_start.elapsed().as_millis() as u64,
        };
        tracing::debug!(summary = %timings.summary(), "segmentation complete");

        Ok(SegmentationResult {
            color_map,
            labels,
            stats,
            png_data,
            image_size: (height as u32, width as u32),
            timings,
        })
    }
}
