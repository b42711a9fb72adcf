#![allow(clippy::missing_errors_doc)]
#![allow(clippy::uninlined_format_args)]

//! # cityseg
//!
//! Deterministic semantic segmentation pipeline for urban street scenes.
//!
//! Takes encoded image bytes, runs a fixed-resolution segmentation model
//! (Cityscapes-style, 8 classes at 256x512 by default), and produces a
//! color-coded PNG segmentation map plus per-class pixel coverage
//! statistics. The model is an opaque inference function behind the
//! [`InferenceBackend`] trait: ONNX Runtime in production, a synthetic
//! random backend for tests and model-less environments (explicit opt-in).
//!
//! ## Pipeline
//!
//! bytes → decode (ordered codec fallback) → stretch-resize + normalize →
//! inference → arg-max labels → {palette colorize → PNG, coverage stats}
//!
//! The inference backend loads lazily on the first request and is reused for
//! the process lifetime; everything else is stateless per request.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use cityseg::{SegmentationConfig, SegmentationProcessor};
//!
//! # fn example(upload_bytes: Vec<u8>) -> anyhow::Result<()> {
//! let config = SegmentationConfig::builder()
//!     .model_path("model/unet_cityscapes.onnx")
//!     .build()?;
//! let processor = SegmentationProcessor::new(config)?;
//!
//! let result = processor.process(&upload_bytes)?;
//! std::fs::write("segmented.png", &result.png_data)?;
//! println!("stats: {}", result.stats_json()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Deterministic testing without a model
//!
//! ```rust
//! use cityseg::{BackendKind, SegmentationConfig, SegmentationProcessor};
//!
//! # fn example() -> anyhow::Result<()> {
//! let mut config = SegmentationConfig::cityscapes();
//! config.backend = BackendKind::Synthetic; // explicit opt-in
//! config.synthetic_seed = Some(42);
//! let processor = SegmentationProcessor::new(config)?;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod inference;
pub mod postprocess;
pub mod preprocess;
pub mod processor;
pub mod stats;
pub mod types;

use tokio::io::AsyncRead;

// Public API exports
#[cfg(feature = "onnx")]
pub use backends::OnnxBackend;
pub use backends::SyntheticBackend;
pub use config::{BackendKind, ExecutionProvider, SegmentationConfig, SegmentationConfigBuilder};
pub use decoder::{DecodeStrategy, ImageDecoder};
pub use encoder::ImageEncoder;
pub use error::{Result, SegmentationError};
pub use inference::{BackendFactory, DefaultBackendFactory, InferenceBackend};
pub use postprocess::{Colorizer, LabelMapper, Palette};
pub use preprocess::Preprocessor;
pub use processor::SegmentationProcessor;
pub use stats::StatsCalculator;
pub use types::{
    ClassStats, LabelGrid, ProcessingTimings, SegmentationReport, SegmentationResult,
    SegmentationStats,
};

/// Segment an image provided as encoded bytes
///
/// Thin wrapper over [`SegmentationProcessor::process`] for callers that
/// prefer a free function.
///
/// # Errors
///
/// Propagates every pipeline failure; see [`SegmentationProcessor::process`].
pub fn segment_from_bytes(
    bytes: &[u8],
    processor: &SegmentationProcessor,
) -> Result<SegmentationResult> {
    processor.process(bytes)
}

/// Segment an image read from an async stream
///
/// Reads the stream to its end, then runs the synchronous pipeline. Suitable
/// for upload bodies and file streams; callers with heavy concurrent load may
/// wrap the call in their runtime's blocking-pool primitive.
///
/// # Errors
///
/// Returns `SegmentationError::Io` on stream read failures, plus every
/// pipeline failure of [`SegmentationProcessor::process`].
pub async fn segment_from_reader<R: AsyncRead + Unpin>(
    mut reader: R,
    processor: &SegmentationProcessor,
) -> Result<SegmentationResult> {
    let mut buffer = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut buffer).await?;
    processor.process(&buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_processor() -> SegmentationProcessor {
        let mut config = SegmentationConfig::cityscapes();
        config.backend = BackendKind::Synthetic;
        config.synthetic_seed = Some(1);
        config.input_size = (16, 32);
        SegmentationProcessor::new(config).unwrap()
    }

    fn png_fixture() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([0, 128, 255]));
        let mut buffer = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut buffer),
                image::ImageFormat::Png,
            )
            .unwrap();
        buffer
    }

    #[test]
    fn test_segment_from_bytes() {
        let processor = synthetic_processor();
        let result = segment_from_bytes(&png_fixture(), &processor).unwrap();
        assert_eq!(result.image_size, (16, 32));
    }

    #[tokio::test]
    async fn test_segment_from_reader() {
        let processor = synthetic_processor();
        let reader = std::io::Cursor::new(png_fixture());
        let result = segment_from_reader(reader, &processor).await.unwrap();
        assert_eq!(result.image_size, (16, 32));
        assert!(!result.png_data.is_empty());
    }
}
