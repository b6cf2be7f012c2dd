//! Learned parameters of the ranking model.
//!
//! All parameters live in one explicit [`PhoenixParams`] struct that is
//! threaded through the forward pass. There is no implicit name-scoped
//! parameter registry: each reducer and encoder receives its weight matrix
//! as an argument, and the product-surface table is shared between the
//! history and candidate call sites by passing the same value to both.
//!
//! The surrounding training/serving framework owns parameter versioning
//! (checkpoints, optimizer updates); the forward pass only reads.

use ndarray::Array2;
use phoenix_layers::{EmbeddingTable, Initializer};
use serde::{Deserialize, Serialize};

use crate::config::PhoenixModelConfig;
use crate::error::{ModelError, ModelResult};

/// The model's learned weight matrices and tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoenixParams {
    /// `[num_user_hashes * D, D]` fuses stacked user hash embeddings.
    pub user_proj: Array2<f32>,
    /// `[(num_item_hashes + num_author_hashes) * D + 2D, D]` fuses history
    /// post, author, action, and product-surface features per position.
    pub history_proj: Array2<f32>,
    /// `[(num_item_hashes + num_author_hashes) * D + D, D]` fuses candidate
    /// post, author, and product-surface features per position.
    pub candidate_proj: Array2<f32>,
    /// `[num_actions, D]` projects signed multi-hot action vectors.
    pub action_proj: Array2<f32>,
    /// `[product_surface_vocab_size, D]` shared product-surface table.
    pub product_surface_table: EmbeddingTable,
    /// `[D, num_actions]` unembedding to per-action logits.
    pub unembed: Array2<f32>,
}

fn user_in_width(config: &PhoenixModelConfig) -> usize {
    config.hash_config.num_user_hashes * config.emb_size
}

fn history_in_width(config: &PhoenixModelConfig) -> usize {
    let hashes = &config.hash_config;
    (hashes.num_item_hashes + hashes.num_author_hashes) * config.emb_size + 2 * config.emb_size
}

fn candidate_in_width(config: &PhoenixModelConfig) -> usize {
    let hashes = &config.hash_config;
    (hashes.num_item_hashes + hashes.num_author_hashes) * config.emb_size + config.emb_size
}

impl PhoenixParams {
    /// Initializes all parameters with fan-out variance scaling at scale 1.
    pub fn init(config: &PhoenixModelConfig, seed: Option<u64>) -> Self {
        Self::init_with_scale(config, 1.0, seed)
    }

    /// Initializes all parameters with fan-out variance scaling at the
    /// given scale.
    ///
    /// Each matrix draws from its own sub-stream of `seed` so parameter
    /// values are stable under reordering of the fields.
    pub fn init_with_scale(
        config: &PhoenixModelConfig,
        embed_init_scale: f32,
        seed: Option<u64>,
    ) -> Self {
        let init = Initializer::fan_out(embed_init_scale);
        let sub = |k: u64| seed.map(|s| s.wrapping_add(k));
        let d = config.emb_size;

        Self {
            user_proj: init.initialize(user_in_width(config), d, sub(1)),
            history_proj: init.initialize(history_in_width(config), d, sub(2)),
            candidate_proj: init.initialize(candidate_in_width(config), d, sub(3)),
            action_proj: init.initialize(config.num_actions, d, sub(4)),
            product_surface_table: EmbeddingTable::new(
                config.product_surface_vocab_size,
                d,
                init,
                sub(5),
            ),
            unembed: init.initialize(d, config.num_actions, sub(6)),
        }
    }

    /// Validates every parameter shape against the configuration.
    pub fn validate(&self, config: &PhoenixModelConfig) -> ModelResult<()> {
        let d = config.emb_size;
        let checks: [(&str, &[usize], Vec<usize>); 5] = [
            ("user_proj", self.user_proj.shape(), vec![user_in_width(config), d]),
            (
                "history_proj",
                self.history_proj.shape(),
                vec![history_in_width(config), d],
            ),
            (
                "candidate_proj",
                self.candidate_proj.shape(),
                vec![candidate_in_width(config), d],
            ),
            (
                "action_proj",
                self.action_proj.shape(),
                vec![config.num_actions, d],
            ),
            ("unembed", self.unembed.shape(), vec![d, config.num_actions]),
        ];
        for (name, actual, expected) in checks {
            if actual != expected.as_slice() {
                return Err(ModelError::ConfigError {
                    message: format!(
                        "parameter {} has shape {:?}, expected {:?}",
                        name, actual, expected
                    ),
                });
            }
        }
        let table = &self.product_surface_table;
        if table.vocab_size() != config.product_surface_vocab_size || table.dim() != d {
            return Err(ModelError::ConfigError {
                message: format!(
                    "product_surface_table has shape [{}, {}], expected [{}, {}]",
                    table.vocab_size(),
                    table.dim(),
                    config.product_surface_vocab_size,
                    d
                ),
            });
        }
        Ok(())
    }
}
