//! Image preprocessing: stretch-resize and tensor normalization
//!
//! The model expects a fixed input resolution. Source images are stretched to
//! fit (no letterboxing or cropping), matching the training-time
//! preprocessing, then scaled into `[0.0, 1.0]` as an NHWC float tensor.

use crate::error::{Result, SegmentationError};
use image::{imageops, imageops::FilterType, RgbImage};
use ndarray::{Array3, Array4, Axis};

/// Resizes and normalizes canonical RGB images for inference
#[derive(Debug, Clone)]
pub struct Preprocessor {
    /// Model input size as (height, width)
    target_size: (u32, u32),
}

impl Preprocessor {
    /// Create a preprocessor for the given model input size (height, width)
    #[must_use]
    pub fn new(target_size: (u32, u32)) -> Self {
        Self { target_size }
    }

    /// Model input size as (height, width)
    #[must_use]
    pub fn target_size(&self) -> (u32, u32) {
        self.target_size
    }

    /// Resize to the model input size and normalize to `[0.0, 1.0]`
    ///
    /// Output shape is always (height, width, 3) at the configured size,
    /// regardless of source dimensions. Bilinear (triangle) filtering keeps
    /// the resize deterministic.
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::EmptyImage` for a zero-area source and
    /// `SegmentationError::Preprocess` if tensor construction fails, with the
    /// nested message preserved.
    pub fn normalize(&self, image: &RgbImage) -> Result<Array3<f32>> {
        let (src_width, src_height) = image.dimensions();
        if src_width == 0 || src_height == 0 {
            return Err(SegmentationError::EmptyImage);
        }

        let (target_height, target_width) = self.target_size;
        let resized = imageops::resize(image, target_width, target_height, FilterType::Triangle);

        let mut data = Vec::with_capacity(resized.as_raw().len());
        data.extend(resized.as_raw().iter().map(|&v| f32::from(v) / 255.0));

        Array3::from_shape_vec(
            (target_height as usize, target_width as usize, 3),
            data,
        )
        .map_err(|e| {
            SegmentationError::preprocess(format!(
                "failed to shape {src_width}x{src_height} source into {target_height}x{target_width}x3 tensor: {e}"
            ))
        })
    }

    /// Normalize and add the batch axis, producing the (1, height, width, 3)
    /// tensor the inference boundary expects
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Preprocessor::normalize`].
    pub fn prepare(&self, image: &RgbImage) -> Result<Array4<f32>> {
        Ok(self.normalize(image)?.insert_axis(Axis(0)))
    }
}
