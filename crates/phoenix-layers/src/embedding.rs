//! Dense embedding table for single-hot categorical features.
//!
//! Unlike the sparse hash-table embeddings (which are looked up upstream
//! and arrive pre-materialized), small categorical vocabularies such as
//! product surfaces are embedded through an owned dense table. The lookup
//! is equivalent to a one-hot-times-table matrix product but implemented
//! as a bounds-checked row gather.
//!
//! Sharing semantics matter: when two call sites must see the same table
//! (history and candidate product surfaces), pass the *same*
//! [`EmbeddingTable`] by reference to both. There is no name-keyed
//! parameter registry to deduplicate tables behind the scenes.

use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::error::{LayerError, LayerResult};
use crate::initializer::Initializer;

/// A learned `[vocab_size, dim]` embedding table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingTable {
    weights: Array2<f32>,
}

impl EmbeddingTable {
    /// Creates a table with freshly initialized weights.
    pub fn new(
        vocab_size: usize,
        dim: usize,
        initializer: Initializer,
        seed: Option<u64>,
    ) -> Self {
        Self {
            weights: initializer.initialize(vocab_size, dim, seed),
        }
    }

    /// Wraps existing weights.
    ///
    /// # Errors
    ///
    /// Returns a [`LayerError::ConfigError`] if the table is empty in
    /// either dimension.
    pub fn from_weights(weights: Array2<f32>) -> LayerResult<Self> {
        if weights.nrows() == 0 || weights.ncols() == 0 {
            return Err(LayerError::ConfigError {
                message: format!("embedding table must be non-empty, got {:?}", weights.dim()),
            });
        }
        Ok(Self { weights })
    }

    /// Returns the vocabulary size.
    pub fn vocab_size(&self) -> usize {
        self.weights.nrows()
    }

    /// Returns the embedding dimension.
    pub fn dim(&self) -> usize {
        self.weights.ncols()
    }

    /// Returns the underlying weight matrix.
    pub fn weights(&self) -> &Array2<f32> {
        &self.weights
    }

    /// Embeds a `[B, S]` index tensor as `[B, S, dim]`.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::IndexOutOfRange`] on the first index at or
    /// beyond the vocabulary size. Out-of-vocabulary indices are a caller
    /// bug, not a case to clamp over.
    pub fn lookup(&self, indices: &Array2<usize>) -> LayerResult<Array3<f32>> {
        let (b, s) = indices.dim();
        let d = self.dim();
        let mut out = Array3::<f32>::zeros((b, s, d));
        for ((i, j), &idx) in indices.indexed_iter() {
            if idx >= self.vocab_size() {
                return Err(LayerError::IndexOutOfRange {
                    index: idx,
                    vocab_size: self.vocab_size(),
                });
            }
            out.slice_mut(ndarray::s![i, j, ..])
                .assign(&self.weights.row(idx));
        }
        Ok(out)
    }
}
