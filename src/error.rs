//! Error types for segmentation pipeline operations

use thiserror::Error;

/// Result type alias for segmentation operations
pub type Result<T> = std::result::Result<T, SegmentationError>;

/// Error taxonomy for the segmentation pipeline
///
/// Decode and empty-image errors map to client-side failures at the HTTP
/// boundary; shape and palette errors indicate configuration bugs and are
/// not transient; model unavailability is distinct from per-request failure
/// and typically requires operator intervention.
#[derive(Error, Debug)]
pub enum SegmentationError {
    /// Input bytes could not be decoded by any strategy
    #[error("decode error: {0}")]
    Decode(String),

    /// Resize or tensor conversion failed; wraps the nested failure
    #[error("preprocess error: {0}")]
    Preprocess(String),

    /// Model artifact missing or failed to load
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Per-request inference failure inside an initialized backend
    #[error("inference error: {0}")]
    Inference(String),

    /// Class axis of the probability tensor does not match the configured class count
    #[error("shape mismatch: expected class axis of length {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// A label value fell outside the palette / class range
    #[error("label {label} outside class range 0..{classes}")]
    PaletteIndex { label: usize, classes: usize },

    /// Zero-area input image
    #[error("empty image: input has zero pixels")]
    EmptyImage,

    /// Output image encoding failed
    #[error("encode error: {0}")]
    Encode(String),

    /// Invalid configuration or parameters
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for unexpected conditions
    #[error("internal error: {0}")]
    Internal(String),
}

impl SegmentationError {
    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new preprocess error
    pub fn preprocess<S: Into<String>>(msg: S) -> Self {
        Self::Preprocess(msg.into())
    }

    /// Create a new model-unavailable error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error indicates malformed client input rather than a
    /// service-side fault (4xx-equivalent at an HTTP boundary)
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::EmptyImage)
    }
}
