//! End-to-end forward-pass tests against a stub backbone.
//!
//! The backbone is an external collaborator; these tests plug a
//! pass-through implementation into the full pipeline and exercise the
//! assembled-sequence layout, masking, batch independence, and the output
//! contract.

use ndarray::{Array2, Array3, Array4};
use phoenix_model::prelude::*;

/// Pass-through backbone satisfying the `[B, L, D]` shape contract.
struct IdentityBackbone;

impl Backbone for IdentityBackbone {
    fn forward(
        &self,
        embeddings: &Array3<f32>,
        _padding_mask: &Array2<bool>,
        _candidate_start_offset: usize,
    ) -> ModelResult<BackboneOutput> {
        Ok(BackboneOutput {
            embeddings: embeddings.clone(),
        })
    }
}

const D: usize = 8;
const S: usize = 4;
const C: usize = 3;
const A: usize = 5;

fn config() -> PhoenixModelConfig {
    PhoenixModelConfig::new(BackboneConfig::new(D, 2, 2), D, A)
        .with_history_seq_len(S)
        .with_candidate_seq_len(C)
        .with_fprop_dtype(DType::F32)
        .with_hash_config(HashConfig {
            num_user_hashes: 2,
            num_item_hashes: 2,
            num_author_hashes: 1,
        })
        .with_name("forward-test")
}

fn model() -> PhoenixModel {
    let mut config = config();
    config.initialize().unwrap();
    config.make(Box::new(IdentityBackbone), Some(42)).unwrap()
}

/// Builds a batch whose features depend only on the logical example ids,
/// so slicing the batch down to one example is reproducible exactly.
fn batch_for(examples: &[usize]) -> RecsysBatch {
    let b = examples.len();
    let ex = |i: usize| examples[i] as u64;
    RecsysBatch {
        user_hashes: Array2::from_shape_fn((b, 2), |(i, h)| 100 + ex(i) * 10 + h as u64),
        history_post_hashes: Array3::from_shape_fn((b, S, 2), |(i, s, h)| {
            200 + ex(i) * 100 + s as u64 * 10 + h as u64
        }),
        history_author_hashes: Array3::from_shape_fn((b, S, 1), |(i, s, _)| {
            300 + ex(i) * 100 + s as u64
        }),
        history_actions: Array3::from_shape_fn((b, S, A), |(i, s, a)| {
            // Deterministic multi-hot pattern; rows where (i + s) % 4 != 0
            // are entirely zero, exercising the action validity gate.
            if (examples[i] + s) % 4 == 0 && a % 2 == 0 {
                1.0
            } else {
                0.0
            }
        }),
        history_product_surface: Array2::from_shape_fn((b, S), |(i, s)| (examples[i] + s) % 16),
        candidate_post_hashes: Array3::from_shape_fn((b, C, 2), |(i, c, h)| {
            400 + ex(i) * 100 + c as u64 * 10 + h as u64
        }),
        candidate_author_hashes: Array3::from_shape_fn((b, C, 1), |(i, c, _)| {
            500 + ex(i) * 100 + c as u64
        }),
        candidate_product_surface: Array2::from_shape_fn((b, C), |(i, c)| (examples[i] + c) % 16),
    }
}

fn embeddings_for(examples: &[usize]) -> RecsysEmbeddings {
    let b = examples.len();
    let v = |parts: &[usize]| -> f32 {
        let sum: usize = parts.iter().sum();
        (sum % 13) as f32 * 0.05 - 0.25
    };
    RecsysEmbeddings {
        user_embeddings: Array3::from_shape_fn((b, 2, D), |(i, h, d)| v(&[examples[i], h, d])),
        history_post_embeddings: Array4::from_shape_fn((b, S, 2, D), |(i, s, h, d)| {
            v(&[examples[i], s, h, d, 1])
        }),
        history_author_embeddings: Array4::from_shape_fn((b, S, 1, D), |(i, s, h, d)| {
            v(&[examples[i], s, h, d, 2])
        }),
        candidate_post_embeddings: Array4::from_shape_fn((b, C, 2, D), |(i, c, h, d)| {
            v(&[examples[i], c, h, d, 3])
        }),
        candidate_author_embeddings: Array4::from_shape_fn((b, C, 1, D), |(i, c, h, d)| {
            v(&[examples[i], c, h, d, 4])
        }),
    }
}

#[test]
fn candidate_offset_is_one_plus_history_len_for_any_batch_size() {
    let model = model();
    for b in [1, 2, 5] {
        let examples: Vec<usize> = (0..b).collect();
        let (_, _, offset) = model
            .build_inputs(&batch_for(&examples), &embeddings_for(&examples))
            .unwrap();
        assert_eq!(offset, 1 + S);
    }
}

#[test]
fn masks_follow_first_hash_slot_rule() {
    let model = model();
    let examples = [0, 1];
    let mut batch = batch_for(&examples);
    // Pad out: user of example 0, history step 2 of example 1, candidate 1
    // of example 0. Only the first hash slot gates validity.
    batch.user_hashes[[0, 0]] = 0;
    batch.history_post_hashes[[1, 2, 0]] = 0;
    batch.candidate_post_hashes[[0, 1, 0]] = 0;
    // Zero *second* slot elsewhere must not affect validity.
    batch.user_hashes[[1, 1]] = 0;

    let (_, mask, offset) = model
        .build_inputs(&batch, &embeddings_for(&examples))
        .unwrap();
    assert!(!mask[[0, 0]]);
    assert!(mask[[1, 0]]);
    assert!(!mask[[1, 1 + 2]]);
    assert!(mask[[0, 1 + 2]]);
    assert!(!mask[[0, offset + 1]]);
    assert!(mask[[1, offset + 1]]);
}

#[test]
fn logits_shape_matches_contract() {
    let model = model();
    for b in [1, 3] {
        let examples: Vec<usize> = (0..b).collect();
        let out = model
            .forward(&batch_for(&examples), &embeddings_for(&examples))
            .unwrap();
        assert_eq!(out.logits.dim(), (b, C, A));
    }
}

#[test]
fn logits_are_invariant_to_batch_composition() {
    let model = model();
    let full = model
        .forward(&batch_for(&[0, 1, 2]), &embeddings_for(&[0, 1, 2]))
        .unwrap();
    let solo = model
        .forward(&batch_for(&[1]), &embeddings_for(&[1]))
        .unwrap();

    for c in 0..C {
        for a in 0..A {
            let diff = (full.logits[[1, c, a]] - solo.logits[[0, c, a]]).abs();
            assert!(diff < 1e-6, "cross-batch leakage at [{}, {}]: {}", c, a, diff);
        }
    }
}

#[test]
fn forward_is_idempotent() {
    let model = model();
    let examples = [0, 1];
    let batch = batch_for(&examples);
    let embeddings = embeddings_for(&examples);

    let first = model.forward(&batch, &embeddings).unwrap();
    let second = model.forward(&batch, &embeddings).unwrap();
    assert_eq!(first.logits, second.logits);
}

#[test]
fn mismatched_hash_count_is_rejected_not_reshaped() {
    let model = model();
    let examples = [0, 1];
    let mut embeddings = embeddings_for(&examples);
    // Three user hash slots against HashConfig { num_user_hashes: 2, .. }.
    embeddings.user_embeddings = Array3::zeros((2, 3, D));

    match model.forward(&batch_for(&examples), &embeddings) {
        Err(ModelError::ShapeMismatch { feature, .. }) => {
            assert_eq!(feature, "user_embeddings");
        }
        other => panic!("expected ShapeMismatch, got {:?}", other.map(|o| o.logits.dim())),
    }
}

#[test]
fn masked_out_candidates_still_get_finite_logits() {
    let model = model();
    let examples = [0, 1];
    let mut batch = batch_for(&examples);
    // Fully pad out candidate 2 of example 0: all hash slots zero.
    for h in 0..2 {
        batch.candidate_post_hashes[[0, 2, h]] = 0;
    }
    batch.candidate_author_hashes[[0, 2, 0]] = 0;

    let out = model.forward(&batch, &embeddings_for(&examples)).unwrap();
    assert_eq!(out.logits.dim(), (2, C, A));
    assert!(out.logits.iter().all(|v| v.is_finite()));
}

#[test]
fn bf16_forward_precision_rounds_logits() {
    let mut config = config().with_fprop_dtype(DType::Bf16);
    config.initialize().unwrap();
    let model = config.make(Box::new(IdentityBackbone), Some(42)).unwrap();

    let examples = [0, 1];
    let out = model
        .forward(&batch_for(&examples), &embeddings_for(&examples))
        .unwrap();
    // Every logit must be exactly representable in bf16.
    for &v in out.logits.iter() {
        assert_eq!(v, DType::Bf16.quantize(v));
    }
}
