//! Hash-block reducers.
//!
//! Each entity is hashed by several independent hash functions upstream,
//! and one embedding is looked up per hash slot. The reducers' only job is
//! to fuse those per-slot embeddings (plus side features) into one vector
//! per position at the target width, and to derive a validity mask. They
//! never hash or look anything up.
//!
//! Masking rule: a position is valid iff its *first* hash slot is nonzero
//! (hash 0 is the reserved padding sentinel). Extra hash slots are
//! auxiliary signal and do not gate validity; their embeddings are folded
//! into the fused vector unconditionally.

use ndarray::{concatenate, Array2, Array3, Array4, Axis};
use phoenix_layers::ops::{project2, project3};

use crate::error::{ModelError, ModelResult};

/// Collapses the trailing hash and feature axes of `[B, S, H, D]` into
/// `[B, S, H*D]`.
fn flatten_hash_slots(name: &'static str, x: &Array4<f32>) -> ModelResult<Array3<f32>> {
    let (b, s, h, d) = x.dim();
    Array3::from_shape_vec((b, s, h * d), x.iter().copied().collect()).map_err(|_| {
        ModelError::ShapeMismatch {
            feature: name,
            expected: vec![b, s, h * d],
            actual: x.shape().to_vec(),
        }
    })
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

/// Fuses stacked user hash embeddings into a length-1 sequence segment.
///
/// # Arguments
///
/// * `user_hashes` - `[B, H_u]` raw hash values, `0` meaning padding
/// * `user_embeddings` - `[B, H_u, D]` one embedding per hash slot
/// * `proj` - `[H_u * D, D]` learned fusion projection
///
/// # Returns
///
/// `([B, 1, D], [B, 1])`: the fused user segment and its validity mask.
pub fn block_user_reduce(
    user_hashes: &Array2<u64>,
    user_embeddings: &Array3<f32>,
    proj: &Array2<f32>,
) -> ModelResult<(Array3<f32>, Array2<bool>)> {
    let (b, h, d) = user_embeddings.dim();
    check("user_hashes", user_hashes.shape(), &[b, h])?;

    let flat = Array2::from_shape_vec((b, h * d), user_embeddings.iter().copied().collect())
        .map_err(|_| ModelError::ShapeMismatch {
            feature: "user_embeddings",
            expected: vec![b, h * d],
            actual: user_embeddings.shape().to_vec(),
        })?;
    let fused = project2(&flat, proj)?.insert_axis(Axis(1));

    let mask = Array2::from_shape_fn((b, 1), |(i, _)| user_hashes[[i, 0]] != 0);
    Ok((fused, mask))
}

/// Fuses history post, author, action, and product-surface features into
/// one vector per history position.
///
/// # Arguments
///
/// * `history_post_hashes` - `[B, S, H_i]` raw post hash values
/// * `post_embeddings` - `[B, S, H_i, D]`
/// * `author_embeddings` - `[B, S, H_a, D]`
/// * `action_embeddings` - `[B, S, D]` pre-computed action embeddings
/// * `surface_embeddings` - `[B, S, D]` product-surface embeddings
/// * `proj` - `[(H_i + H_a) * D + 2D, D]` learned fusion projection
///
/// # Returns
///
/// `([B, S, D], [B, S])`: the fused history segment and its validity mask.
pub fn block_history_reduce(
    history_post_hashes: &Array3<u64>,
    post_embeddings: &Array4<f32>,
    author_embeddings: &Array4<f32>,
    action_embeddings: &Array3<f32>,
    surface_embeddings: &Array3<f32>,
    proj: &Array2<f32>,
) -> ModelResult<(Array3<f32>, Array2<bool>)> {
    let (b, s, h_i, d) = post_embeddings.dim();
    let (_, _, h_a, _) = author_embeddings.dim();
    check("history_post_hashes", history_post_hashes.shape(), &[b, s, h_i])?;
    check(
        "history_author_embeddings",
        author_embeddings.shape(),
        &[b, s, h_a, d],
    )?;
    check("history_actions_embeddings", action_embeddings.shape(), &[b, s, d])?;
    check(
        "history_product_surface_embeddings",
        surface_embeddings.shape(),
        &[b, s, d],
    )?;

    let posts = flatten_hash_slots("history_post_embeddings", post_embeddings)?;
    let authors = flatten_hash_slots("history_author_embeddings", author_embeddings)?;
    let concatenated = concatenate(
        Axis(2),
        &[
            posts.view(),
            authors.view(),
            action_embeddings.view(),
            surface_embeddings.view(),
        ],
    )
    .map_err(|_| ModelError::ShapeMismatch {
        feature: "history feature concatenation",
        expected: vec![b, s],
        actual: vec![posts.dim().0, posts.dim().1],
    })?;

    let fused = project3(&concatenated, proj)?;
    let mask = Array2::from_shape_fn((b, s), |(i, j)| history_post_hashes[[i, j, 0]] != 0);
    Ok((fused, mask))
}

/// Fuses candidate post, author, and product-surface features into one
/// vector per candidate position.
///
/// Candidates carry no action history: the model is predicting their
/// actions, not consuming them, so the action input is absent here.
///
/// # Arguments
///
/// * `candidate_post_hashes` - `[B, C, H_i]` raw post hash values
/// * `post_embeddings` - `[B, C, H_i, D]`
/// * `author_embeddings` - `[B, C, H_a, D]`
/// * `surface_embeddings` - `[B, C, D]` product-surface embeddings
/// * `proj` - `[(H_i + H_a) * D + D, D]` learned fusion projection
///
/// # Returns
///
/// `([B, C, D], [B, C])`: the fused candidate segment and its validity mask.
pub fn block_candidate_reduce(
    candidate_post_hashes: &Array3<u64>,
    post_embeddings: &Array4<f32>,
    author_embeddings: &Array4<f32>,
    surface_embeddings: &Array3<f32>,
    proj: &Array2<f32>,
) -> ModelResult<(Array3<f32>, Array2<bool>)> {
    let (b, c, h_i, d) = post_embeddings.dim();
    let (_, _, h_a, _) = author_embeddings.dim();
    check(
        "candidate_post_hashes",
        candidate_post_hashes.shape(),
        &[b, c, h_i],
    )?;
    check(
        "candidate_author_embeddings",
        author_embeddings.shape(),
        &[b, c, h_a, d],
    )?;
    check(
        "candidate_product_surface_embeddings",
        surface_embeddings.shape(),
        &[b, c, d],
    )?;

    let posts = flatten_hash_slots("candidate_post_embeddings", post_embeddings)?;
    let authors = flatten_hash_slots("candidate_author_embeddings", author_embeddings)?;
    let concatenated = concatenate(
        Axis(2),
        &[posts.view(), authors.view(), surface_embeddings.view()],
    )
    .map_err(|_| ModelError::ShapeMismatch {
        feature: "candidate feature concatenation",
        expected: vec![b, c],
        actual: vec![posts.dim().0, posts.dim().1],
    })?;

    let fused = project3(&concatenated, proj)?;
    let mask = Array2::from_shape_fn((b, c), |(i, j)| candidate_post_hashes[[i, j, 0]] != 0);
    Ok((fused, mask))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2, Array3, Array4};

    const D: usize = 4;

    fn identity_like(rows: usize, cols: usize) -> Array2<f32> {
        Array2::from_shape_fn((rows, cols), |(i, j)| if i == j { 1.0 } else { 0.0 })
    }

    #[test]
    fn test_user_reduce_shapes_and_mask() {
        let hashes = array![[7u64, 9], [0, 3]];
        let emb = Array3::<f32>::ones((2, 2, D));
        let proj = identity_like(2 * D, D);

        let (fused, mask) = block_user_reduce(&hashes, &emb, &proj).unwrap();
        assert_eq!(fused.dim(), (2, 1, D));
        assert_eq!(mask.dim(), (2, 1));
        assert!(mask[[0, 0]]);
        assert!(!mask[[1, 0]]); // first slot is the padding sentinel
    }

    #[test]
    fn test_user_mask_ignores_later_slots() {
        // Nonzero first slot, zero second slot: still valid.
        let hashes = array![[5u64, 0]];
        let emb = Array3::<f32>::ones((1, 2, D));
        let proj = identity_like(2 * D, D);
        let (_, mask) = block_user_reduce(&hashes, &emb, &proj).unwrap();
        assert!(mask[[0, 0]]);
    }

    #[test]
    fn test_user_reduce_rejects_hash_count_mismatch() {
        let hashes = Array2::<u64>::ones((2, 3));
        let emb = Array3::<f32>::ones((2, 2, D));
        let proj = identity_like(2 * D, D);
        assert!(block_user_reduce(&hashes, &emb, &proj).is_err());
    }

    #[test]
    fn test_user_reduce_rejects_wrong_proj_width() {
        let hashes = Array2::<u64>::ones((2, 2));
        let emb = Array3::<f32>::ones((2, 2, D));
        let proj = identity_like(3 * D, D); // expects 3 hash slots
        assert!(block_user_reduce(&hashes, &emb, &proj).is_err());
    }

    #[test]
    fn test_history_reduce_shapes_and_mask() {
        let (b, s, h_i, h_a) = (2, 3, 2, 1);
        let mut hashes = Array3::<u64>::ones((b, s, h_i));
        hashes[[1, 2, 0]] = 0; // pad out last history step of example 1

        let post = Array4::<f32>::ones((b, s, h_i, D));
        let author = Array4::<f32>::ones((b, s, h_a, D));
        let actions = Array3::<f32>::zeros((b, s, D));
        let surface = Array3::<f32>::zeros((b, s, D));
        let in_width = (h_i + h_a) * D + 2 * D;
        let proj = identity_like(in_width, D);

        let (fused, mask) =
            block_history_reduce(&hashes, &post, &author, &actions, &surface, &proj).unwrap();
        assert_eq!(fused.dim(), (b, s, D));
        assert_eq!(mask.dim(), (b, s));
        assert!(mask[[0, 2]]);
        assert!(!mask[[1, 2]]);
    }

    #[test]
    fn test_history_reduce_fuses_all_inputs() {
        // With a ones projection, each output entry is the sum of the
        // concatenated feature vector, so every input contributes.
        let (b, s, h_i, h_a) = (1, 1, 1, 1);
        let hashes = Array3::<u64>::ones((b, s, h_i));
        let post = Array4::from_elem((b, s, h_i, D), 1.0);
        let author = Array4::from_elem((b, s, h_a, D), 2.0);
        let actions = Array3::from_elem((b, s, D), 3.0);
        let surface = Array3::from_elem((b, s, D), 4.0);
        let proj = Array2::<f32>::ones(((h_i + h_a) * D + 2 * D, D));

        let (fused, _) =
            block_history_reduce(&hashes, &post, &author, &actions, &surface, &proj).unwrap();
        let expected = (1.0 + 2.0 + 3.0 + 4.0) * D as f32;
        assert!((fused[[0, 0, 0]] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_candidate_reduce_shapes_and_mask() {
        let (b, c, h_i, h_a) = (2, 3, 2, 1);
        let mut hashes = Array3::<u64>::ones((b, c, h_i));
        hashes[[0, 0, 0]] = 0;

        let post = Array4::<f32>::ones((b, c, h_i, D));
        let author = Array4::<f32>::ones((b, c, h_a, D));
        let surface = Array3::<f32>::zeros((b, c, D));
        let proj = identity_like((h_i + h_a) * D + D, D);

        let (fused, mask) =
            block_candidate_reduce(&hashes, &post, &author, &surface, &proj).unwrap();
        assert_eq!(fused.dim(), (b, c, D));
        assert!(!mask[[0, 0]]);
        assert!(mask[[1, 0]]);
    }

    #[test]
    fn test_candidate_reduce_rejects_misaligned_author_batch() {
        let (b, c, h_i, h_a) = (2, 3, 2, 1);
        let hashes = Array3::<u64>::ones((b, c, h_i));
        let post = Array4::<f32>::ones((b, c, h_i, D));
        let author = Array4::<f32>::ones((b + 1, c, h_a, D));
        let surface = Array3::<f32>::zeros((b, c, D));
        let proj = identity_like((h_i + h_a) * D + D, D);

        match block_candidate_reduce(&hashes, &post, &author, &surface, &proj) {
            Err(ModelError::ShapeMismatch { feature, .. }) => {
                assert_eq!(feature, "candidate_author_embeddings");
            }
            other => panic!("expected ShapeMismatch, got {:?}", other),
        }
    }
}
