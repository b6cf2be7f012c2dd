//! Transformer-based ranking model for a recommendation pipeline.
//!
//! Given a user, their interaction history, and a set of candidate items,
//! the model produces per-candidate, per-action logits used to rank the
//! candidates. The crate owns the feature-fusion and embedding-composition
//! layer: sparse multi-hash categorical features (users, posts, authors)
//! and multi-hot action/context features are fused into one dense sequence
//! with correct padding semantics across the three structurally different
//! segments (user, history, candidates), then handed to a shared
//! transformer backbone consumed through the [`Backbone`] call contract.
//!
//! # Pipeline
//!
//! ```text
//! batch + pre-looked-up embeddings
//!   -> hash-block reducers / scalar encoders
//!   -> assembled sequence [B, 1+S+C, D] + mask + candidate offset
//!   -> backbone -> layer norm -> candidate slice -> unembedding
//!   -> logits [B, C, A]
//! ```
//!
//! # Example
//!
//! ```no_run
//! use phoenix_model::prelude::*;
//!
//! let mut config = PhoenixModelConfig::new(BackboneConfig::new(64, 4, 4), 64, 8)
//!     .with_history_seq_len(128)
//!     .with_candidate_seq_len(32)
//!     .with_name("phoenix-ranker");
//! config.initialize().unwrap();
//!
//! # fn build_backbone(_c: &BackboneConfig) -> Box<dyn Backbone> { unimplemented!() }
//! let backbone = build_backbone(&config.backbone);
//! let model = config.make(backbone, None).unwrap();
//! # let (batch, embeddings): (RecsysBatch, RecsysEmbeddings) = unimplemented!();
//! let output = model.forward(&batch, &embeddings).unwrap();
//! ```
//!
//! Embedding-table hash lookups happen upstream and arrive pre-materialized
//! in [`RecsysEmbeddings`]; training, checkpointing, and serving live in the
//! surrounding framework.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod action;
pub mod backbone;
pub mod batch;
pub mod config;
pub mod error;
pub mod model;
pub mod params;
pub mod reduce;

pub use action::encode_actions;
pub use backbone::{Backbone, BackboneConfig, BackboneOutput};
pub use batch::{RecsysBatch, RecsysEmbeddings, RecsysModelOutput};
pub use config::{HashConfig, PhoenixModelConfig};
pub use error::{ModelError, ModelResult};
pub use model::PhoenixModel;
pub use params::PhoenixParams;
pub use reduce::{block_candidate_reduce, block_history_reduce, block_user_reduce};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::backbone::{Backbone, BackboneConfig, BackboneOutput};
    pub use crate::batch::{RecsysBatch, RecsysEmbeddings, RecsysModelOutput};
    pub use crate::config::{HashConfig, PhoenixModelConfig};
    pub use crate::error::{ModelError, ModelResult};
    pub use crate::model::PhoenixModel;
    pub use crate::params::PhoenixParams;
    pub use phoenix_layers::DType;
}
