//! Multi-hot action encoding.
//!
//! History positions carry a multi-hot vector of the actions taken at
//! that step. The indicators are remapped `{0, 1} -> {-1, +1}` before
//! projection so that "action absent" contributes distinguishable signal
//! instead of silently dropping out of the matmul. Positions where *no*
//! action bit is set are then zeroed outright: the gate is computed from
//! the pre-remap indicators, so all-absent positions emit the exact zero
//! vector regardless of the learned projection.

use ndarray::{s, Array2, Array3};
use phoenix_layers::ops::{cast_inplace, project3};
use phoenix_layers::DType;

use crate::error::ModelResult;

/// Encodes a multi-hot action tensor as dense embeddings.
///
/// # Arguments
///
/// * `actions` - `[B, S, A]` indicators in {0, 1}
/// * `proj` - `[A, D]` learned projection
/// * `fprop_dtype` - precision the output is rounded to
///
/// # Returns
///
/// `[B, S, D]` action embeddings, exactly zero at positions with no
/// actions set.
pub fn encode_actions(
    actions: &Array3<f32>,
    proj: &Array2<f32>,
    fprop_dtype: DType,
) -> ModelResult<Array3<f32>> {
    let signed = actions.mapv(|a| 2.0 * a - 1.0);
    let mut embedded = project3(&signed, proj)?;

    let (b, s, _) = actions.dim();
    for i in 0..b {
        for j in 0..s {
            if actions.slice(s![i, j, ..]).iter().all(|&a| a == 0.0) {
                embedded.slice_mut(s![i, j, ..]).fill(0.0);
            }
        }
    }

    cast_inplace(&mut embedded, fprop_dtype);
    Ok(embedded)
}
