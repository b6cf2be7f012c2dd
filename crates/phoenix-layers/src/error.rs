//! Error types for the phoenix-layers crate.
//!
//! Shape and dimension mismatches are precondition violations: the caller
//! handed us tensors that cannot be combined. They are surfaced as errors
//! rather than silently broadcast or truncated.

use thiserror::Error;

/// Error type for layer and tensor operations.
#[derive(Debug, Error)]
pub enum LayerError {
    /// Shape mismatch between expected and actual tensor shapes.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// The expected shape
        expected: Vec<usize>,
        /// The actual shape that was provided
        actual: Vec<usize>,
    },

    /// The trailing feature dimension does not match the weight matrix.
    #[error("Invalid input dimension: expected {expected}, got {actual}")]
    InvalidInputDimension {
        /// The expected input dimension
        expected: usize,
        /// The actual input dimension
        actual: usize,
    },

    /// A categorical index fell outside the table's vocabulary.
    #[error("Index {index} out of range for vocabulary of size {vocab_size}")]
    IndexOutOfRange {
        /// The offending index
        index: usize,
        /// The table's vocabulary size
        vocab_size: usize,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },
}

/// Result type alias for layer operations.
pub type LayerResult<T> = Result<T, LayerError>;
