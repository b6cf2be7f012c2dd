//! Transformer backbone call contract.
//!
//! The backbone itself (attention, feed-forward blocks, norm internals) is
//! an imported component; this module pins down the only thing the model
//! depends on: the shape contract of one forward call. Any implementation
//! satisfying [`Backbone`] can be plugged into the ranking head.

use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::error::ModelResult;

/// Refined sequence embeddings returned by a backbone call.
#[derive(Debug, Clone)]
pub struct BackboneOutput {
    /// Same-shaped `[B, L, D]` sequence of refined embeddings.
    pub embeddings: Array3<f32>,
}

/// The call contract for the shared transformer backbone.
///
/// `candidate_start_offset` marks where candidate positions begin in the
/// assembled sequence; the backbone is expected to treat it as a boundary
/// hint (for example, for masking semantics between context and query
/// positions) and to return a sequence with the same `[B, L, D]` shape it
/// was given.
pub trait Backbone: Send + Sync {
    /// Runs the backbone over an assembled sequence.
    ///
    /// # Arguments
    ///
    /// * `embeddings` - `[B, L, D]` input sequence
    /// * `padding_mask` - `[B, L]` validity flags, `true` for real positions
    /// * `candidate_start_offset` - index of the first candidate position
    fn forward(
        &self,
        embeddings: &Array3<f32>,
        padding_mask: &Array2<bool>,
        candidate_start_offset: usize,
    ) -> ModelResult<BackboneOutput>;
}

/// Static hyperparameters of the backbone, carried by the model config.
///
/// Construction of the actual backbone from these hyperparameters happens
/// in the host framework; the model only validates that the backbone width
/// agrees with its embedding width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackboneConfig {
    /// Width of the residual stream; must equal the model's `emb_size`.
    pub model_dim: usize,
    /// Number of transformer layers.
    pub num_layers: usize,
    /// Number of attention heads; must divide `model_dim`.
    pub num_heads: usize,
}

impl BackboneConfig {
    /// Creates a backbone configuration.
    pub fn new(model_dim: usize, num_layers: usize, num_heads: usize) -> Self {
        Self {
            model_dim,
            num_layers,
            num_heads,
        }
    }
}
