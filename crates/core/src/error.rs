//! Error types for the index, the vector set, and the classifier.
//!
//! Every failure is local and synchronous: it is returned from the call that
//! detected it and nothing is retried internally. Degenerate but valid inputs
//! (an empty database, an empty query batch, a query with no votes) are not
//! errors and never show up here.

use thiserror::Error;

/// Errors raised by [`VectorSet`](crate::VectorSet),
/// [`FeatureIndex`](crate::FeatureIndex), and [`classify`](crate::classify).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    /// A vector's length differs from the dimension fixed by the set or index.
    #[error("vector {index} has dimension {found}, expected {expected}")]
    DimensionMismatch {
        /// Position of the offending vector in its input sequence.
        index: usize,
        expected: usize,
        found: usize,
    },

    /// Parallel vector and label sequences have different lengths.
    #[error("{vectors} vectors but {labels} labels")]
    LengthMismatch { vectors: usize, labels: usize },

    /// An index or label lies outside `[0, len)`.
    #[error("index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },

    /// Classification was requested with zero classes.
    #[error("classification requires at least one class")]
    NoClasses,

    /// A construction or query parameter was rejected.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result alias for fallible core operations.
pub type Result<T> = std::result::Result<T, MatchError>;
