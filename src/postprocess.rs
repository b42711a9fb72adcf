//! Label mapping and colorization
//!
//! Reduces the model's probability tensor to a discrete label grid and turns
//! labels into a display color image via palette lookup.

use crate::error::{Result, SegmentationError};
use crate::types::LabelGrid;
use image::{Rgb, RgbImage};
use ndarray::{Array2, ArrayView3};
use serde::{Deserialize, Serialize};

/// Fixed ordered mapping from class index to display color
///
/// Immutable at runtime; shared read-only between the colorizer and callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    colors: Vec<[u8; 3]>,
}

impl Palette {
    /// Create a palette from ordered RGB rows
    #[must_use]
    pub fn new(colors: Vec<[u8; 3]>) -> Self {
        Self { colors }
    }

    /// Color for a class index, or None if the index is out of range
    #[must_use]
    pub fn color(&self, class_index: usize) -> Option<[u8; 3]> {
        self.colors.get(class_index).copied()
    }

    /// Number of classes this palette covers
    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// Reduces probability tensors to discrete label grids via arg-max
#[derive(Debug, Clone)]
pub struct LabelMapper {
    n_classes: usize,
}

impl LabelMapper {
    /// Create a mapper expecting the given class-axis length
    #[must_use]
    pub fn new(n_classes: usize) -> Self {
        Self { n_classes }
    }

    /// Select the highest-scoring class per pixel
    ///
    /// Exact ties resolve to the lowest class index (first-occurring
    /// maximum). Total over any well-shaped tensor; NaN values never win
    /// against the incumbent.
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::ShapeMismatch` when the class axis length
    /// differs from the configured class count.
    pub fn map(&self, probabilities: &ArrayView3<'_, f32>) -> Result<LabelGrid> {
        let (height, width, classes) = probabilities.dim();
        if classes != self.n_classes {
            return Err(SegmentationError::ShapeMismatch {
                expected: self.n_classes,
                actual: classes,
            });
        }

        let mut labels = Array2::<u8>::zeros((height, width));
        for y in 0..height {
            for x in 0..width {
                let mut best_class = 0usize;
                let mut best_score = probabilities[[y, x, 0]];
                for class in 1..classes {
                    let score = probabilities[[y, x, class]];
                    if score > best_score {
                        best_score = score;
                        best_class = class;
                    }
                }
                labels[[y, x]] = best_class as u8;
            }
        }
        Ok(labels)
    }
}

/// Turns label grids into color images via palette lookup
#[derive(Debug, Clone)]
pub struct Colorizer {
    palette: Palette,
}

impl Colorizer {
    /// Create a colorizer over the given palette
    #[must_use]
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    /// Replace every label with its palette row
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::PaletteIndex` if a label falls outside the
    /// palette. The label mapper's contract makes this unreachable, but the
    /// boundary is checked anyway.
    pub fn colorize(&self, labels: &LabelGrid) -> Result<RgbImage> {
        let (height, width) = labels.dim();
        let mut image = RgbImage::new(width as u32, height as u32);
        for ((y, x), &label) in labels.indexed_iter() {
            let color = self.palette.color(label as usize).ok_or_else(|| {
                SegmentationError::PaletteIndex {
                    label: label as usize,
                    classes: self.palette.len(),
                }
            })?;
            image.put_pixel(x as u32, y as u32, Rgb(color));
        }
        Ok(image)
    }
}
