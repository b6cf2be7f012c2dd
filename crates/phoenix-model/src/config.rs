//! Model configuration.
//!
//! [`PhoenixModelConfig`] carries every static hyperparameter of the
//! ranking model. It is constructed once, explicitly [`initialize`]d
//! (which validates it and flips a readiness flag), and then [`make`]
//! composes it with a backbone and freshly initialized parameters into a
//! [`PhoenixModel`]. Calling `make` before `initialize` is tolerated for
//! backward compatibility: it warns and auto-initializes.
//!
//! [`initialize`]: PhoenixModelConfig::initialize
//! [`make`]: PhoenixModelConfig::make

use phoenix_layers::DType;
use serde::{Deserialize, Serialize};

use crate::backbone::{Backbone, BackboneConfig};
use crate::error::{ModelError, ModelResult};
use crate::model::PhoenixModel;
use crate::params::PhoenixParams;

/// Counts of independent hash functions per entity kind.
///
/// Hashing each entity with several independent functions and fusing the
/// looked-up embeddings reduces collision-induced aliasing. These counts
/// determine the input widths of the hash-block reducers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashConfig {
    /// Hash functions applied to the user.
    pub num_user_hashes: usize,
    /// Hash functions applied to posts (history and candidate).
    pub num_item_hashes: usize,
    /// Hash functions applied to authors.
    pub num_author_hashes: usize,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            num_user_hashes: 2,
            num_item_hashes: 2,
            num_author_hashes: 2,
        }
    }
}

/// Static hyperparameters of the ranking model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoenixModelConfig {
    /// Backbone hyperparameters; `model_dim` must equal `emb_size`.
    pub backbone: BackboneConfig,
    /// Embedding width D of the assembled sequence.
    pub emb_size: usize,
    /// Size of the action space (logit width per candidate).
    pub num_actions: usize,
    /// Number of history positions S.
    pub history_seq_len: usize,
    /// Number of candidate positions C.
    pub candidate_seq_len: usize,
    /// Optional model name, used in log messages.
    pub name: Option<String>,
    /// Numeric precision for forward-pass activations.
    pub fprop_dtype: DType,
    /// Hash function counts per entity kind.
    pub hash_config: HashConfig,
    /// Vocabulary size of the product-surface feature.
    pub product_surface_vocab_size: usize,
    #[serde(skip)]
    initialized: bool,
}

impl PhoenixModelConfig {
    /// Creates a configuration with default sequence lengths (128 history
    /// positions, 32 candidates), a 16-entry product-surface vocabulary,
    /// bf16 forward precision, and default hash counts.
    pub fn new(backbone: BackboneConfig, emb_size: usize, num_actions: usize) -> Self {
        Self {
            backbone,
            emb_size,
            num_actions,
            history_seq_len: 128,
            candidate_seq_len: 32,
            name: None,
            fprop_dtype: DType::Bf16,
            hash_config: HashConfig::default(),
            product_surface_vocab_size: 16,
            initialized: false,
        }
    }

    /// Sets the history sequence length.
    pub fn with_history_seq_len(mut self, len: usize) -> Self {
        self.history_seq_len = len;
        self
    }

    /// Sets the candidate sequence length.
    pub fn with_candidate_seq_len(mut self, len: usize) -> Self {
        self.candidate_seq_len = len;
        self
    }

    /// Sets the hash function counts.
    pub fn with_hash_config(mut self, hash_config: HashConfig) -> Self {
        self.hash_config = hash_config;
        self
    }

    /// Sets the model name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the forward-pass activation precision.
    pub fn with_fprop_dtype(mut self, dtype: DType) -> Self {
        self.fprop_dtype = dtype;
        self
    }

    /// Sets the product-surface vocabulary size.
    pub fn with_product_surface_vocab_size(mut self, size: usize) -> Self {
        self.product_surface_vocab_size = size;
        self
    }

    /// Total assembled sequence length: user(1) + history + candidates.
    pub fn seq_len(&self) -> usize {
        1 + self.history_seq_len + self.candidate_seq_len
    }

    /// Returns whether [`initialize`](Self::initialize) has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Validates the configuration and marks it ready for `make`.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError::ConfigError`] naming the first invalid
    /// field.
    pub fn initialize(&mut self) -> ModelResult<&mut Self> {
        self.validate()?;
        self.initialized = true;
        Ok(self)
    }

    /// Builds a model from this configuration and the given backbone.
    ///
    /// Parameters are freshly initialized; `seed` fixes the initializer
    /// RNG stream. If the configuration was never initialized, a warning
    /// is emitted and initialization (including validation) runs here.
    pub fn make(
        &mut self,
        backbone: Box<dyn Backbone>,
        seed: Option<u64>,
    ) -> ModelResult<PhoenixModel> {
        if !self.initialized {
            tracing::warn!(
                name = self.name.as_deref().unwrap_or("<unnamed>"),
                "PhoenixModel is not initialized. Initializing."
            );
            self.initialize()?;
        }
        let params = PhoenixParams::init(self, seed);
        PhoenixModel::new(backbone, params, self.clone())
    }

    fn validate(&self) -> ModelResult<()> {
        fn positive(value: usize, what: &str) -> ModelResult<()> {
            if value == 0 {
                return Err(ModelError::ConfigError {
                    message: format!("{} must be positive", what),
                });
            }
            Ok(())
        }

        positive(self.emb_size, "emb_size")?;
        positive(self.num_actions, "num_actions")?;
        positive(self.history_seq_len, "history_seq_len")?;
        positive(self.candidate_seq_len, "candidate_seq_len")?;
        positive(self.product_surface_vocab_size, "product_surface_vocab_size")?;
        positive(self.hash_config.num_user_hashes, "num_user_hashes")?;
        positive(self.hash_config.num_item_hashes, "num_item_hashes")?;
        positive(self.hash_config.num_author_hashes, "num_author_hashes")?;
        positive(self.backbone.num_layers, "backbone.num_layers")?;
        positive(self.backbone.num_heads, "backbone.num_heads")?;

        if self.backbone.model_dim != self.emb_size {
            return Err(ModelError::ConfigError {
                message: format!(
                    "backbone model_dim {} must equal emb_size {}",
                    self.backbone.model_dim, self.emb_size
                ),
            });
        }
        if self.backbone.model_dim % self.backbone.num_heads != 0 {
            return Err(ModelError::ConfigError {
                message: format!(
                    "backbone num_heads {} must divide model_dim {}",
                    self.backbone.num_heads, self.backbone.model_dim
                ),
            });
        }
        Ok(())
    }
}
