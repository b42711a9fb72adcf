//! Lossless encoding of color segmentation maps

use crate::error::{Result, SegmentationError};
use image::{ImageFormat, RgbImage};
use std::io::Cursor;

/// Serializes color images into compressed byte buffers
pub struct ImageEncoder;

impl ImageEncoder {
    /// Encode a color map as lossless PNG
    ///
    /// The PNG codec consumes RGB in-order, so no channel swap is needed.
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::Encode` on codec failure.
    pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| SegmentationError::encode(format!("PNG encoding failed: {e}")))?;
        Ok(buffer)
    }
}
