//! Configuration types for the segmentation pipeline

use crate::error::{Result, SegmentationError};
use crate::postprocess::Palette;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Execution provider options for ONNX Runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionProvider {
    /// Auto-detect best available provider (CUDA > `CoreML` > CPU)
    Auto,
    /// CPU execution (always available)
    Cpu,
    /// NVIDIA CUDA GPU acceleration
    Cuda,
    /// Apple Silicon GPU acceleration
    CoreMl,
}

impl Default for ExecutionProvider {
    fn default() -> Self {
        Self::Auto
    }
}

impl std::fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
            Self::CoreMl => write!(f, "coreml"),
        }
    }
}

/// Inference backend selection
///
/// The synthetic backend produces random but correctly shaped probability
/// tensors. It exists for tests and for environments without a model
/// artifact, and must be selected explicitly; nothing in the pipeline falls
/// back to it on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    /// ONNX Runtime backed by a real model artifact
    Onnx,
    /// Synthetic random-output backend (explicit opt-in, never a fallback)
    Synthetic,
}

impl Default for BackendKind {
    fn default() -> Self {
        Self::Onnx
    }
}

/// Configuration for segmentation operations
///
/// The class count, palette, and class names must be mutually consistent;
/// [`SegmentationConfig::validate`] enforces this as a load-time invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Path to the ONNX model artifact
    pub model_path: PathBuf,

    /// Which inference backend to build
    pub backend: BackendKind,

    /// Execution provider for ONNX Runtime
    pub execution_provider: ExecutionProvider,

    /// Number of semantic classes the model distinguishes
    pub n_classes: usize,

    /// Model input size as (height, width)
    pub input_size: (u32, u32),

    /// Display color per class index
    pub palette: Palette,

    /// Ordered class names, one per class index
    pub class_names: Vec<String>,

    /// Seed for the synthetic backend (None = entropy)
    pub synthetic_seed: Option<u64>,

    /// Number of intra-op threads for inference (0 = auto)
    pub intra_threads: usize,

    /// Number of inter-op threads for inference (0 = auto)
    pub inter_threads: usize,
}

impl SegmentationConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> SegmentationConfigBuilder {
        SegmentationConfigBuilder::new()
    }

    /// Preset matching the Cityscapes U-Net service this pipeline was built
    /// around: 8 classes at a fixed 256x512 input
    #[must_use]
    pub fn cityscapes() -> Self {
        Self {
            model_path: PathBuf::from("model/unet_cityscapes.onnx"),
            backend: BackendKind::default(),
            execution_provider: ExecutionProvider::default(),
            n_classes: 8,
            input_size: (256, 512),
            palette: Palette::new(vec![
                [128, 64, 128], // road
                [220, 20, 60],  // building
                [0, 0, 142],    // car
                [70, 70, 70],   // traffic sign
                [190, 153, 153], // person
                [107, 142, 35], // vegetation
                [70, 130, 180], // sky
                [0, 0, 0],      // background
            ]),
            class_names: vec![
                "road".to_string(),
                "building".to_string(),
                "car".to_string(),
                "traffic_sign".to_string(),
                "person".to_string(),
                "vegetation".to_string(),
                "sky".to_string(),
                "background".to_string(),
            ],
            synthetic_seed: None,
            intra_threads: 0,
            inter_threads: 0,
        }
    }

    /// Validate the mutual consistency of class count, palette, and names
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::InvalidConfig` when:
    /// - the class count is zero or exceeds 256 (labels are stored as `u8`)
    /// - palette row count or class name count differ from the class count
    /// - class names are not unique
    /// - the input size has a zero dimension
    pub fn validate(&self) -> Result<()> {
        if self.n_classes == 0 {
            return Err(SegmentationError::invalid_config(
                "class count must be at least 1",
            ));
        }
        if self.n_classes > 256 {
            return Err(SegmentationError::invalid_config(format!(
                "class count {} exceeds the 256 labels representable as u8",
                self.n_classes
            )));
        }
        if self.palette.len() != self.n_classes {
            return Err(SegmentationError::invalid_config(format!(
                "palette has {} rows but {} classes are configured",
                self.palette.len(),
                self.n_classes
            )));
        }
        if self.class_names.len() != self.n_classes {
            return Err(SegmentationError::invalid_config(format!(
                "{} class names given but {} classes are configured",
                self.class_names.len(),
                self.n_classes
            )));
        }
        let unique: HashSet<&str> = self.class_names.iter().map(String::as_str).collect();
        if unique.len() != self.class_names.len() {
            return Err(SegmentationError::invalid_config(
                "class names must be unique",
            ));
        }
        let (height, width) = self.input_size;
        if height == 0 || width == 0 {
            return Err(SegmentationError::invalid_config(format!(
                "model input size {height}x{width} has a zero dimension"
            )));
        }
        Ok(())
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self::cityscapes()
    }
}

/// Builder for [`SegmentationConfig`]
///
/// Starts from the Cityscapes preset; override the fields that differ.
pub struct SegmentationConfigBuilder {
    config: SegmentationConfig,
}

impl SegmentationConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SegmentationConfig::default(),
        }
    }

    #[must_use]
    pub fn model_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.model_path = path.into();
        self
    }

    #[must_use]
    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.config.backend = backend;
        self
    }

    #[must_use]
    pub fn execution_provider(mut self, provider: ExecutionProvider) -> Self {
        self.config.execution_provider = provider;
        self
    }

    /// Set class count, palette, and names together so they stay consistent
    #[must_use]
    pub fn classes(mut self, palette: Palette, class_names: Vec<String>) -> Self {
        self.config.n_classes = class_names.len();
        self.config.palette = palette;
        self.config.class_names = class_names;
        self
    }

    #[must_use]
    pub fn input_size(mut self, height: u32, width: u32) -> Self {
        self.config.input_size = (height, width);
        self
    }

    #[must_use]
    pub fn synthetic_seed(mut self, seed: u64) -> Self {
        self.config.synthetic_seed = Some(seed);
        self
    }

    #[must_use]
    pub fn intra_threads(mut self, threads: usize) -> Self {
        self.config.intra_threads = threads;
        self
    }

    #[must_use]
    pub fn inter_threads(mut self, threads: usize) -> Self {
        self.config.inter_threads = threads;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    ///
    /// Propagates [`SegmentationConfig::validate`] failures.
    pub fn build(self) -> Result<SegmentationConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for SegmentationConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
