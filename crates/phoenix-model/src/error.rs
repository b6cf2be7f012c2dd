//! Error types for the phoenix-model crate.

use phoenix_layers::LayerError;
use thiserror::Error;

/// Error type for model construction and forward passes.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A named feature's shape disagrees with the configuration or with
    /// a sibling tensor it must align with.
    #[error("Shape mismatch for {feature}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Which batch or embedding field is malformed
        feature: &'static str,
        /// The expected shape
        expected: Vec<usize>,
        /// The actual shape that was provided
        actual: Vec<usize>,
    },

    /// Invalid model configuration.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// Error bubbled up from a layer operation.
    #[error(transparent)]
    Layer(#[from] LayerError),

    /// The backbone returned a sequence whose shape violates its contract.
    #[error("Backbone contract violation: expected output shape {expected:?}, got {actual:?}")]
    BackboneContract {
        /// The expected `[B, L, D]` shape
        expected: Vec<usize>,
        /// The shape the backbone actually returned
        actual: Vec<usize>,
    },
}

/// Result type alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
