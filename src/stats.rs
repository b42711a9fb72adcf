//! Per-class coverage statistics over a label grid

use crate::error::{Result, SegmentationError};
use crate::types::{ClassStats, LabelGrid, SegmentationStats};
use std::collections::BTreeMap;

/// Round to 2 decimal places, half away from zero
fn round_percentage(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Computes per-class pixel counts and percentages
#[derive(Debug, Clone)]
pub struct StatsCalculator {
    class_names: Vec<String>,
}

impl StatsCalculator {
    /// Create a calculator over the ordered class names
    #[must_use]
    pub fn new(class_names: Vec<String>) -> Self {
        Self { class_names }
    }

    /// Compute coverage statistics for one label grid
    ///
    /// Every class is present in the result, including classes with zero
    /// pixels. Pixel counts sum exactly to height x width; percentages are
    /// rounded per class to 2 decimals, so their sum may deviate from 100.0
    /// by a few hundredths.
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::EmptyImage` for a zero-area grid and
    /// `SegmentationError::PaletteIndex` if a label exceeds the class range.
    pub fn calculate(&self, labels: &LabelGrid) -> Result<SegmentationStats> {
        let total_pixels = labels.len();
        if total_pixels == 0 {
            return Err(SegmentationError::EmptyImage);
        }

        let mut counts = vec![0u64; self.class_names.len()];
        for &label in labels {
            let slot = counts.get_mut(label as usize).ok_or_else(|| {
                SegmentationError::PaletteIndex {
                    label: label as usize,
                    classes: self.class_names.len(),
                }
            })?;
            *slot += 1;
        }

        let mut classes = BTreeMap::new();
        for (name, &pixel_count) in self.class_names.iter().zip(&counts) {
            let percentage = (pixel_count as f64 / total_pixels as f64) * 100.0;
            classes.insert(
                name.clone(),
                ClassStats {
                    pixel_count,
                    percentage: round_percentage(percentage),
                },
            );
        }
        Ok(SegmentationStats::new(classes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn calculator() -> StatsCalculator {
        StatsCalculator::new(vec![
            "road".to_string(),
            "building".to_string(),
            "sky".to_string(),
        ])
    }

    #[test]
    fn test_counts_sum_to_grid_area() {
        let labels = Array2::from_shape_fn((10, 10), |(y, x)| ((y * 10 + x) % 3) as u8);
        let stats = calculator().calculate(&labels).unwrap();
        assert_eq!(stats.total_pixel_count(), 100);
    }

    #[test]
    fn test_all_classes_present_even_at_zero() {
        let labels = Array2::<u8>::zeros((5, 5));
        let stats = calculator().calculate(&labels).unwrap();

        assert_eq!(stats.len(), 3);
        assert_eq!(stats.get("road").unwrap().pixel_count, 25);
        assert!((stats.get("road").unwrap().percentage - 100.0).abs() < f64::EPSILON);
        assert_eq!(stats.get("building").unwrap().pixel_count, 0);
        assert!(stats.get("building").unwrap().percentage.abs() < f64::EPSILON);
        assert_eq!(stats.get("sky").unwrap().pixel_count, 0);
    }

    #[test]
    fn test_rounded_percentages_sum_near_100() {
        // 7x7 grid gives percentages with repeating decimals
        let labels = Array2::from_shape_fn((7, 7), |(y, x)| ((y + x) % 3) as u8);
        let stats = calculator().calculate(&labels).unwrap();

        let sum: f64 = stats.iter().map(|(_, c)| c.percentage).sum();
        assert!((sum - 100.0).abs() <= 0.1, "rounded sum was {sum}");
    }

    #[test]
    fn test_percentage_rounding_to_two_decimals() {
        // 1 of 3 pixels = 33.333...% -> 33.33
        let labels = Array2::from_shape_vec((1, 3), vec![0u8, 1, 1]).unwrap();
        let stats = StatsCalculator::new(vec!["a".to_string(), "b".to_string()])
            .calculate(&labels)
            .unwrap();
        assert!((stats.get("a").unwrap().percentage - 33.33).abs() < 1e-9);
        assert!((stats.get("b").unwrap().percentage - 66.67).abs() < 1e-9);
    }

    #[test]
    fn test_empty_grid_rejected() {
        let labels = Array2::<u8>::zeros((0, 0));
        assert!(matches!(
            calculator().calculate(&labels),
            Err(SegmentationError::EmptyImage)
        ));
    }

    #[test]
    fn test_out_of_range_label_rejected() {
        let labels = Array2::from_elem((2, 2), 7u8);
        let err = calculator().calculate(&labels).unwrap_err();
        assert!(matches!(
            err,
            SegmentationError::PaletteIndex {
                label: 7,
                classes: 3
            }
        ));
    }
}
