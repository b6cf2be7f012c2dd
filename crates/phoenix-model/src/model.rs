//! The ranking model: input assembly and the ranking head.
//!
//! One forward pass is purely functional: the model reads its parameters,
//! never mutates them, and keeps no state between calls. Concurrent calls
//! against the same parameter snapshot are independent.

use ndarray::{concatenate, s, Array2, Array3, Axis};
use phoenix_layers::ops::{cast_inplace, layer_norm, project3};

use crate::action::encode_actions;
use crate::backbone::Backbone;
use crate::batch::{RecsysBatch, RecsysEmbeddings, RecsysModelOutput};
use crate::config::PhoenixModelConfig;
use crate::error::{ModelError, ModelResult};
use crate::params::PhoenixParams;
use crate::reduce::{block_candidate_reduce, block_history_reduce, block_user_reduce};

const LAYER_NORM_EPS: f32 = 1e-5;

/// Transformer-based ranking model over user, history, and candidate
/// features.
///
/// Constructed via [`PhoenixModelConfig::make`], or directly from a
/// backbone, parameters, and config via [`PhoenixModel::new`].
pub struct PhoenixModel {
    backbone: Box<dyn Backbone>,
    params: PhoenixParams,
    config: PhoenixModelConfig,
}

impl PhoenixModel {
    /// Composes a model from its parts, validating parameter shapes
    /// against the configuration.
    pub fn new(
        backbone: Box<dyn Backbone>,
        params: PhoenixParams,
        config: PhoenixModelConfig,
    ) -> ModelResult<Self> {
        params.validate(&config)?;
        Ok(Self {
            backbone,
            params,
            config,
        })
    }

    /// Returns the model configuration.
    pub fn config(&self) -> &PhoenixModelConfig {
        &self.config
    }

    /// Returns the model parameters.
    pub fn params(&self) -> &PhoenixParams {
        &self.params
    }

    /// Assembles the backbone input sequence from a batch and its
    /// pre-looked-up embeddings.
    ///
    /// The sequence is ordered `user(1) -> history(S) -> candidate(C)`,
    /// the mask concatenated identically, and the returned offset is the
    /// index of the first candidate position, derived from the mask
    /// widths rather than hard-coded so it tracks configuration changes.
    ///
    /// # Returns
    ///
    /// `(sequence [B, 1+S+C, D], padding_mask [B, 1+S+C],
    /// candidate_start_offset)`
    pub fn build_inputs(
        &self,
        batch: &RecsysBatch,
        embeddings: &RecsysEmbeddings,
    ) -> ModelResult<(Array3<f32>, Array2<bool>, usize)> {
        batch.validate(&self.config)?;
        embeddings.validate(batch, &self.config)?;

        let params = &self.params;
        let fprop = self.config.fprop_dtype;

        // One table, two call sites: history and candidate product
        // surfaces share semantics by sharing the parameter itself.
        let table = &params.product_surface_table;
        let mut history_surface = table.lookup(&batch.history_product_surface)?;
        let mut candidate_surface = table.lookup(&batch.candidate_product_surface)?;
        cast_inplace(&mut history_surface, fprop);
        cast_inplace(&mut candidate_surface, fprop);

        let history_actions =
            encode_actions(&batch.history_actions, &params.action_proj, fprop)?;

        let (user_seg, user_mask) = block_user_reduce(
            &batch.user_hashes,
            &embeddings.user_embeddings,
            &params.user_proj,
        )?;
        let (history_seg, history_mask) = block_history_reduce(
            &batch.history_post_hashes,
            &embeddings.history_post_embeddings,
            &embeddings.history_author_embeddings,
            &history_actions,
            &history_surface,
            &params.history_proj,
        )?;
        let (candidate_seg, candidate_mask) = block_candidate_reduce(
            &batch.candidate_post_hashes,
            &embeddings.candidate_post_embeddings,
            &embeddings.candidate_author_embeddings,
            &candidate_surface,
            &params.candidate_proj,
        )?;

        let mut sequence = concatenate(
            Axis(1),
            &[user_seg.view(), history_seg.view(), candidate_seg.view()],
        )
        .map_err(|_| ModelError::ShapeMismatch {
            feature: "sequence concatenation",
            expected: vec![batch.batch_size(), self.config.seq_len(), self.config.emb_size],
            actual: user_seg.shape().to_vec(),
        })?;
        let padding_mask = concatenate(
            Axis(1),
            &[user_mask.view(), history_mask.view(), candidate_mask.view()],
        )
        .map_err(|_| ModelError::ShapeMismatch {
            feature: "mask concatenation",
            expected: vec![batch.batch_size(), self.config.seq_len()],
            actual: user_mask.shape().to_vec(),
        })?;

        let candidate_start_offset = user_mask.ncols() + history_mask.ncols();

        cast_inplace(&mut sequence, fprop);
        Ok((sequence, padding_mask, candidate_start_offset))
    }

    /// Ranks the batch's candidates: per-candidate, per-action logits.
    ///
    /// Runs the assembled sequence through the backbone, standardizes the
    /// refined embeddings over the feature axis, keeps the candidate
    /// region, and projects it to action-logit space.
    pub fn forward(
        &self,
        batch: &RecsysBatch,
        embeddings: &RecsysEmbeddings,
    ) -> ModelResult<RecsysModelOutput> {
        let (sequence, padding_mask, candidate_start_offset) =
            self.build_inputs(batch, embeddings)?;

        let backbone_out =
            self.backbone
                .forward(&sequence, &padding_mask, candidate_start_offset)?;
        if backbone_out.embeddings.dim() != sequence.dim() {
            return Err(ModelError::BackboneContract {
                expected: sequence.shape().to_vec(),
                actual: backbone_out.embeddings.shape().to_vec(),
            });
        }

        let normalized = layer_norm(&backbone_out.embeddings, LAYER_NORM_EPS);
        let candidates = normalized
            .slice(s![.., candidate_start_offset.., ..])
            .to_owned();

        let mut logits = project3(&candidates, &self.params.unembed)?;
        cast_inplace(&mut logits, self.config.fprop_dtype);

        Ok(RecsysModelOutput { logits })
    }
}
