//! Fragment Store Error Types

use std::path::PathBuf;
use thiserror::Error;

/// Errors while reassembling a recording from fragments
#[derive(Debug, Error)]
pub enum LoadError {
    /// A chunk count of zero was requested
    #[error("No fragments requested (chunk count is 0)")]
    NoFragments,

    /// Epoch shape has a zero-length axis
    #[error("Epoch shape {samples}x{channels} has an empty axis")]
    EmptyEpochShape { samples: usize, channels: usize },

    /// Fragment file does not exist
    #[error("Fragment missing: {}", path.display())]
    MissingFragment { path: PathBuf },

    /// Fragment could not be decoded, or is zero-dimensional
    #[error("Malformed fragment {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    /// Fragments disagree on their trailing axes
    #[error("Fragment shapes cannot be concatenated: {0}")]
    ShapeMismatch(String),

    /// Concatenated element count does not divide into whole subjects
    #[error("{elements} elements is not a multiple of {per_subject} (samples x channels) per subject")]
    IncompleteSubject { elements: usize, per_subject: usize },

    /// Label vector length differs from subject count
    #[error("Label count {labels} does not match subject count {subjects}")]
    LabelCountMismatch { labels: usize, subjects: usize },

    /// Any other I/O failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors while splitting an archive into fragments
#[derive(Debug, Error)]
pub enum SplitError {
    /// A chunk count of zero was requested
    #[error("Chunk count must be at least 1")]
    NoChunks,

    /// Archive could not be decoded
    #[error("Cannot decode archive {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// Fragment or archive could not be encoded
    #[error("Cannot encode {}: {reason}", path.display())]
    Encode { path: PathBuf, reason: String },

    /// Keyed archive lacks the feature array
    #[error("Archive has no '{0}' entry")]
    MissingKey(String),

    /// Feature array has no axis to split along
    #[error("Feature array is zero-dimensional and cannot be split")]
    Unsplittable,

    /// Label array holds values that are not whole numbers
    #[error("Label array contains non-integer value {0}")]
    NonIntegerLabel(f64),

    /// Any other I/O failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
