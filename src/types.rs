//! Core result types for segmentation operations

use crate::error::{Result, SegmentationError};
use image::RgbImage;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-pixel discrete class assignment, shape (height, width)
pub type LabelGrid = Array2<u8>;

/// Coverage record for a single class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassStats {
    /// Number of pixels assigned to this class
    pub pixel_count: u64,
    /// Share of the label grid in percent, rounded to 2 decimal places
    pub percentage: f64,
}

/// Coverage statistics over one label grid
///
/// Every configured class is present, including classes with zero pixels.
/// Keys are the unique class names; iteration and serialization order is the
/// `BTreeMap` name order, so serialized output is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentationStats {
    classes: BTreeMap<String, ClassStats>,
}

impl SegmentationStats {
    pub(crate) fn new(classes: BTreeMap<String, ClassStats>) -> Self {
        Self { classes }
    }

    /// Look up the record for a class by name
    #[must_use]
    pub fn get(&self, class_name: &str) -> Option<&ClassStats> {
        self.classes.get(class_name)
    }

    /// Iterate over (class name, record) pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ClassStats)> {
        self.classes.iter()
    }

    /// Number of classes covered
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Sum of pixel counts across all classes
    ///
    /// Equals height x width of the label grid the stats were computed from.
    #[must_use]
    pub fn total_pixel_count(&self) -> u64 {
        self.classes.values().map(|c| c.pixel_count).sum()
    }

    /// JSON representation, e.g. for a response header side channel
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::Internal` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| SegmentationError::internal(format!("failed to serialize stats: {e}")))
    }
}

/// Structured record for the stats-oriented response path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationReport {
    /// Human-readable outcome message
    pub message: String,
    /// Per-class coverage statistics
    pub stats: SegmentationStats,
    /// Label grid dimensions as (height, width)
    pub image_size: (u32, u32),
    /// Elapsed processing time in fractional seconds
    pub processing_time: f64,
}

/// Stage-by-stage timing breakdown for one request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Image decode time (ms)
    pub decode_ms: u64,
    /// Resize + normalization time (ms)
    pub preprocess_ms: u64,
    /// One-time model load, present only on the request that triggered it (ms)
    pub model_load_ms: Option<u64>,
    /// Inference time (ms)
    pub inference_ms: u64,
    /// Arg-max + colorize + stats time (ms)
    pub postprocess_ms: u64,
    /// PNG encode time (ms)
    pub encode_ms: u64,
    /// End-to-end time (ms)
    pub total_ms: u64,
}

impl ProcessingTimings {
    /// Total processing time in fractional seconds
    #[must_use]
    pub fn total_seconds(&self) -> f64 {
        self.total_ms as f64 / 1000.0
    }

    /// One-line timing summary for display
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Total: {}ms | Decode: {}ms | Preprocess: {}ms | Inference: {}ms | Postprocess: {}ms | Encode: {}ms",
            self.total_ms,
            self.decode_ms,
            self.preprocess_ms,
            self.inference_ms,
            self.postprocess_ms,
            self.encode_ms
        )
    }
}

/// Result of one segmentation request
///
/// Carries both output paths of the pipeline: the PNG-encoded color map plus
/// side-channel values, and the structured statistics record.
#[derive(Debug, Clone)]
pub struct SegmentationResult {
    /// Color-coded segmentation map at model resolution
    pub color_map: RgbImage,

    /// Per-pixel class labels the color map and stats derive from
    pub labels: LabelGrid,

    /// Per-class coverage statistics
    pub stats: SegmentationStats,

    /// Lossless PNG encoding of the color map
    pub png_data: Vec<u8>,

    /// Label grid dimensions as (height, width); always the configured model
    /// input size regardless of source image dimensions
    pub image_size: (u32, u32),

    /// Stage timings
    pub timings: ProcessingTimings,
}

impl SegmentationResult {
    /// Elapsed processing time in fractional seconds
    #[must_use]
    pub fn processing_time(&self) -> f64 {
        self.timings.total_seconds()
    }

    /// Build the structured stats record for the response path
    #[must_use]
    pub fn report<S: Into<String>>(&self, message: S) -> SegmentationReport {
        SegmentationReport {
            message: message.into(),
            stats: self.stats.clone(),
            image_size: self.image_size,
            processing_time: self.processing_time(),
        }
    }

    /// String-serialized statistics for a header side channel
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::Internal` if serialization fails.
    pub fn stats_json(&self) -> Result<String> {
        self.stats.to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stats() -> SegmentationStats {
        let mut classes = BTreeMap::new();
        classes.insert(
            "road".to_string(),
            ClassStats {
                pixel_count: 75,
                percentage: 75.0,
            },
        );
        classes.insert(
            "sky".to_string(),
            ClassStats {
                pixel_count: 25,
                percentage: 25.0,
            },
        );
        SegmentationStats::new(classes)
    }

    #[test]
    fn test_stats_lookup_and_totals() {
        let stats = sample_stats();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats.get("road").unwrap().pixel_count, 75);
        assert!(stats.get("car").is_none());
        assert_eq!(stats.total_pixel_count(), 100);
    }

    #[test]
    fn test_stats_json_round_trip() {
        let stats = sample_stats();
        let json = stats.to_json().unwrap();
        let parsed: SegmentationStats = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, stats);
    }

    #[test]
    fn test_stats_json_is_a_name_keyed_mapping() {
        let json = sample_stats().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["road"]["pixel_count"], 75);
        assert_eq!(value["sky"]["percentage"], 25.0);
    }

    #[test]
    fn test_report_shape() {
        let stats = sample_stats();
        let report = SegmentationReport {
            message: "Segmentation performed successfully".to_string(),
            stats,
            image_size: (256, 512),
            processing_time: 0.125,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["image_size"][0], 256);
        assert_eq!(json["image_size"][1], 512);
        assert!(json["processing_time"].as_f64().unwrap() >= 0.0);
        assert!(json["stats"]["road"].is_object());
    }

    #[test]
    fn test_timings_total_seconds() {
        let timings = ProcessingTimings {
            total_ms: 1500,
            ..Default::default()
        };
        assert!((timings.total_seconds() - 1.5).abs() < f64::EPSILON);
        assert!(timings.summary().contains("Total: 1500ms"));
    }
}
