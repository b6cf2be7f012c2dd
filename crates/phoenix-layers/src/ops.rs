//! Tensor operations shared across the model.
//!
//! Everything here is a pure function over `ndarray` arrays: trailing-axis
//! projection (the only matmul the model needs), parameter-free layer
//! normalization, and casting activations to the configured forward
//! precision.

use half::bf16;
use ndarray::{Array2, Array3, Axis};

use crate::error::{LayerError, LayerResult};

/// Numeric precision for forward-pass activations.
///
/// Parameters are stored as `f32` regardless; this only controls the
/// precision activations are rounded to at stage boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum DType {
    /// 32-bit IEEE float; casting is the identity.
    F32,
    /// bfloat16: f32 values are rounded to the nearest bf16 and widened back.
    #[default]
    Bf16,
}

impl DType {
    /// Rounds a single value to this precision.
    pub fn quantize(&self, value: f32) -> f32 {
        match self {
            DType::F32 => value,
            DType::Bf16 => bf16::from_f32(value).to_f32(),
        }
    }
}

/// Rounds every element of a rank-3 activation tensor to `dtype` in place.
pub fn cast_inplace(x: &mut Array3<f32>, dtype: DType) {
    if dtype == DType::F32 {
        return;
    }
    x.mapv_inplace(|v| dtype.quantize(v));
}

/// Multiplies the trailing feature axis of a `[B, K]` input by a `[K, N]`
/// weight matrix.
pub fn project2(x: &Array2<f32>, w: &Array2<f32>) -> LayerResult<Array2<f32>> {
    if x.ncols() != w.nrows() {
        return Err(LayerError::InvalidInputDimension {
            expected: w.nrows(),
            actual: x.ncols(),
        });
    }
    Ok(x.dot(w))
}

/// Multiplies the trailing feature axis of a `[B, S, K]` input by a
/// `[K, N]` weight matrix, treating the leading axes as a flat batch.
pub fn project3(x: &Array3<f32>, w: &Array2<f32>) -> LayerResult<Array3<f32>> {
    let (b, s, k) = x.dim();
    if k != w.nrows() {
        return Err(LayerError::InvalidInputDimension {
            expected: w.nrows(),
            actual: k,
        });
    }
    let n = w.ncols();
    // Copy through logical order so non-contiguous views are handled.
    let flat = Array2::from_shape_vec((b * s, k), x.iter().copied().collect())
        .map_err(|_| LayerError::ShapeMismatch {
            expected: vec![b * s, k],
            actual: x.shape().to_vec(),
        })?;
    let out = flat.dot(w);
    Array3::from_shape_vec((b, s, n), out.into_iter().collect()).map_err(|_| {
        LayerError::ShapeMismatch {
            expected: vec![b, s, n],
            actual: vec![b * s, n],
        }
    })
}

/// Standardizes each feature vector of a `[B, S, D]` tensor to zero mean
/// and unit variance along the feature axis.
///
/// This is the parameter-free normalization applied to backbone output
/// before the unembedding projection.
pub fn layer_norm(x: &Array3<f32>, eps: f32) -> Array3<f32> {
    let d = x.dim().2 as f32;
    let mut out = x.clone();
    for mut row in out.lanes_mut(Axis(2)) {
        let mean = row.sum() / d;
        let var = row.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / d;
        let denom = (var + eps).sqrt();
        row.mapv_inplace(|v| (v - mean) / denom);
    }
    out
}
