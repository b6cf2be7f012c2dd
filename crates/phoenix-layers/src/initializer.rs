//! Weight initialization for projection matrices and embedding tables.
//!
//! The model's learned parameters are all 2-D matrices, so initializers
//! produce [`Array2<f32>`] directly. Variance scaling is the workhorse:
//! the sampling variance is scaled by the fan of the matrix, where "fan"
//! is selected by [`VarianceScalingMode`]. Fan-out mode scales variance by
//! the output width, which keeps the magnitude of projected activations
//! stable regardless of how wide the concatenated input is.
//!
//! Initialization only matters for training; the forward-pass contract is
//! independent of it. Seeds make tests deterministic.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};

/// Which fan the variance is scaled by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarianceScalingMode {
    /// Scale by the input width (first matrix dimension).
    FanIn,
    /// Scale by the output width (second matrix dimension).
    FanOut,
    /// Scale by the average of input and output widths.
    FanAvg,
}

/// Sampling distribution for variance scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarianceScalingDistribution {
    /// Normal distribution truncated to two standard deviations, with the
    /// stddev corrected so the truncated samples keep the target variance.
    TruncatedNormal,
    /// Plain normal distribution.
    Normal,
    /// Uniform distribution over [-limit, limit].
    Uniform,
}

/// Weight initializer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Initializer {
    /// All zeros.
    Zeros,
    /// Constant value.
    Constant(f32),
    /// Variance scaling with configurable mode and distribution.
    VarianceScaling {
        /// Variance multiplier applied before fan scaling.
        scale: f32,
        /// Which fan to scale by.
        mode: VarianceScalingMode,
        /// Sampling distribution.
        distribution: VarianceScalingDistribution,
    },
}

impl Initializer {
    /// Variance scaling in fan-out mode with a truncated normal, the
    /// default used for every learned matrix in this model.
    pub fn fan_out(scale: f32) -> Self {
        Initializer::VarianceScaling {
            scale,
            mode: VarianceScalingMode::FanOut,
            distribution: VarianceScalingDistribution::TruncatedNormal,
        }
    }

    /// Materializes a `[rows, cols]` matrix.
    ///
    /// `seed` fixes the RNG stream; `None` draws a seed from the thread RNG.
    ///
    /// # Panics
    ///
    /// Panics if a variance-scaling `scale` is not positive.
    pub fn initialize(&self, rows: usize, cols: usize, seed: Option<u64>) -> Array2<f32> {
        match *self {
            Initializer::Zeros => Array2::zeros((rows, cols)),
            Initializer::Constant(value) => Array2::from_elem((rows, cols), value),
            Initializer::VarianceScaling {
                scale,
                mode,
                distribution,
            } => {
                assert!(scale > 0.0, "variance scaling scale must be positive");
                let fan = match mode {
                    VarianceScalingMode::FanIn => rows as f32,
                    VarianceScalingMode::FanOut => cols as f32,
                    VarianceScalingMode::FanAvg => (rows + cols) as f32 / 2.0,
                };
                let variance = scale / fan.max(1.0);
                let mut rng = match seed {
                    Some(s) => StdRng::seed_from_u64(s),
                    None => StdRng::seed_from_u64(rand::thread_rng().gen()),
                };
                match distribution {
                    VarianceScalingDistribution::Uniform => {
                        let limit = (3.0 * variance).sqrt();
                        let dist = Uniform::new_inclusive(-limit, limit);
                        Array2::from_shape_fn((rows, cols), |_| dist.sample(&mut rng))
                    }
                    VarianceScalingDistribution::Normal => {
                        let dist = normal(variance.sqrt());
                        Array2::from_shape_fn((rows, cols), |_| dist.sample(&mut rng))
                    }
                    VarianceScalingDistribution::TruncatedNormal => {
                        // 0.8796 is the stddev of a standard normal truncated
                        // to [-2, 2]; dividing restores the target variance.
                        let std = variance.sqrt() / 0.879_625_7_f32;
                        let dist = normal(std);
                        Array2::from_shape_fn((rows, cols), |_| {
                            sample_truncated(&dist, &mut rng)
                        })
                    }
                }
            }
        }
    }
}

fn normal(std: f32) -> Normal<f32> {
    // std is derived from a checked positive scale, so this cannot fail.
    Normal::new(0.0, std.max(f32::MIN_POSITIVE)).unwrap()
}

fn sample_truncated(dist: &Normal<f32>, rng: &mut StdRng) -> f32 {
    let bound = 2.0 * dist.std_dev();
    for _ in 0..64 {
        let z = dist.sample(rng);
        if z.abs() <= bound {
            return z;
        }
    }
    // Vanishingly unlikely after 64 rejections; clamp instead of looping.
    dist.sample(rng).clamp(-bound, bound)
}
