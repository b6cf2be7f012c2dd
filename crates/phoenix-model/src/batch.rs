//! Input batch and pre-looked-up embedding containers.
//!
//! [`RecsysBatch`] carries the sparse feature data (hashes, actions,
//! product surfaces) but no embeddings. [`RecsysEmbeddings`] carries the
//! dense embeddings looked up upstream from the hash tables, positionally
//! aligned with the hash arrays in the batch. Hash value `0` is reserved
//! for padding everywhere; no real entity may hash to 0.
//!
//! Both containers validate exhaustively against the model configuration
//! before any arithmetic happens. A silent broadcast or truncation here
//! would corrupt ranking results undetectably, so every dimension is
//! checked and the first disagreement fails the call.

use ndarray::{Array2, Array3, Array4};

use crate::config::PhoenixModelConfig;
use crate::error::{ModelError, ModelResult};

/// Per-example sparse features for one forward pass.
#[derive(Debug, Clone)]
pub struct RecsysBatch {
    /// `[B, num_user_hashes]` user hash values; `0` is padding.
    pub user_hashes: Array2<u64>,
    /// `[B, S, num_item_hashes]` hashes of history posts.
    pub history_post_hashes: Array3<u64>,
    /// `[B, S, num_author_hashes]` hashes of history post authors.
    pub history_author_hashes: Array3<u64>,
    /// `[B, S, num_actions]` multi-hot action indicators in {0, 1}.
    pub history_actions: Array3<f32>,
    /// `[B, S]` product-surface vocabulary indices for history positions.
    pub history_product_surface: Array2<usize>,
    /// `[B, C, num_item_hashes]` hashes of candidate posts.
    pub candidate_post_hashes: Array3<u64>,
    /// `[B, C, num_author_hashes]` hashes of candidate post authors.
    pub candidate_author_hashes: Array3<u64>,
    /// `[B, C]` product-surface vocabulary indices for candidates.
    pub candidate_product_surface: Array2<usize>,
}

/// Pre-looked-up dense embeddings, one vector per hash slot.
#[derive(Debug, Clone)]
pub struct RecsysEmbeddings {
    /// `[B, num_user_hashes, D]`
    pub user_embeddings: Array3<f32>,
    /// `[B, S, num_item_hashes, D]`
    pub history_post_embeddings: Array4<f32>,
    /// `[B, S, num_author_hashes, D]`
    pub history_author_embeddings: Array4<f32>,
    /// `[B, C, num_item_hashes, D]`
    pub candidate_post_embeddings: Array4<f32>,
    /// `[B, C, num_author_hashes, D]`
    pub candidate_author_embeddings: Array4<f32>,
}

/// Output of one forward pass. No other model state persists across calls.
#[derive(Debug, Clone)]
pub struct RecsysModelOutput {
    /// `[B, candidate_seq_len, num_actions]` per-candidate action logits.
    pub logits: Array3<f32>,
}

fn check(feature: &'static str, actual: &[usize], expected: &[usize]) -> ModelResult<()> {
    if actual != expected {
        return Err(ModelError::ShapeMismatch {
            feature,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}

impl RecsysBatch {
    /// Returns the batch size.
    pub fn batch_size(&self) -> usize {
        self.user_hashes.nrows()
    }

    /// Validates every feature's shape against the configuration.
    ///
    /// Returns the batch size on success.
    pub fn validate(&self, config: &PhoenixModelConfig) -> ModelResult<usize> {
        let b = self.batch_size();
        let s = config.history_seq_len;
        let c = config.candidate_seq_len;
        let hashes = &config.hash_config;

        check(
            "user_hashes",
            self.user_hashes.shape(),
            &[b, hashes.num_user_hashes],
        )?;
        check(
            "history_post_hashes",
            self.history_post_hashes.shape(),
            &[b, s, hashes.num_item_hashes],
        )?;
        check(
            "history_author_hashes",
            self.history_author_hashes.shape(),
            &[b, s, hashes.num_author_hashes],
        )?;
        check(
            "history_actions",
            self.history_actions.shape(),
            &[b, s, config.num_actions],
        )?;
        check(
            "history_product_surface",
            self.history_product_surface.shape(),
            &[b, s],
        )?;
        check(
            "candidate_post_hashes",
            self.candidate_post_hashes.shape(),
            &[b, c, hashes.num_item_hashes],
        )?;
        check(
            "candidate_author_hashes",
            self.candidate_author_hashes.shape(),
            &[b, c, hashes.num_author_hashes],
        )?;
        check(
            "candidate_product_surface",
            self.candidate_product_surface.shape(),
            &[b, c],
        )?;
        Ok(b)
    }
}

impl RecsysEmbeddings {
    /// Validates that every embedding tensor aligns with the batch's hash
    /// arrays and the configured hash counts and embedding width.
    pub fn validate(&self, batch: &RecsysBatch, config: &PhoenixModelConfig) -> ModelResult<()> {
        let b = batch.batch_size();
        let s = config.history_seq_len;
        let c = config.candidate_seq_len;
        let d = config.emb_size;
        let hashes = &config.hash_config;

        check(
            "user_embeddings",
            self.user_embeddings.shape(),
            &[b, hashes.num_user_hashes, d],
        )?;
        check(
            "history_post_embeddings",
            self.history_post_embeddings.shape(),
            &[b, s, hashes.num_item_hashes, d],
        )?;
        check(
            "history_author_embeddings",
            self.history_author_embeddings.shape(),
            &[b, s, hashes.num_author_hashes, d],
        )?;
        check(
            "candidate_post_embeddings",
            self.candidate_post_embeddings.shape(),
            &[b, c, hashes.num_item_hashes, d],
        )?;
        check(
            "candidate_author_embeddings",
            self.candidate_author_embeddings.shape(),
            &[b, c, hashes.num_author_hashes, d],
        )?;
        Ok(())
    }
}
