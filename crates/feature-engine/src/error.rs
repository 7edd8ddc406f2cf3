//! Feature Extraction Error Types

use thiserror::Error;

/// Errors during spectral feature extraction
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// Segment does not fit in the available samples
    #[error("Segment length {segment_len} exceeds the {available} available samples")]
    InsufficientSamples { segment_len: usize, available: usize },

    /// Estimator parameter out of range
    #[error("Invalid spectral parameter: {0}")]
    InvalidParameter(String),

    /// Label vector length differs from subject count
    #[error("Label count {labels} does not match subject count {subjects}")]
    LabelCountMismatch { labels: usize, subjects: usize },

    /// Band name not recognised
    #[error("Unknown band: {0}")]
    UnknownBand(String),
}
