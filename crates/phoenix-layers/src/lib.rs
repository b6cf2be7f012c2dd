//! Numeric building blocks for the Phoenix ranking model.
//!
//! This crate provides the reusable pieces the model crate is assembled
//! from:
//!
//! - **Initializers**: variance-scaling weight initialization
//!   ([`Initializer`]), seedable for deterministic tests
//! - **Tensor ops**: trailing-axis projection, parameter-free layer
//!   normalization, and forward-precision casting ([`ops`])
//! - **Embedding tables**: bounds-checked dense lookup for single-hot
//!   categorical features ([`EmbeddingTable`])
//! - **Errors**: [`LayerError`] for shape and configuration failures
//!
//! # Example
//!
//! ```
//! use phoenix_layers::prelude::*;
//! use ndarray::array;
//!
//! let table = EmbeddingTable::new(16, 4, Initializer::fan_out(1.0), Some(42));
//! let surfaces = array![[0usize, 3], [1, 1]];
//! let embedded = table.lookup(&surfaces).unwrap();
//! assert_eq!(embedded.dim(), (2, 2, 4));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod embedding;
pub mod error;
pub mod initializer;
pub mod ops;

pub use embedding::EmbeddingTable;
pub use error::{LayerError, LayerResult};
pub use initializer::{Initializer, VarianceScalingDistribution, VarianceScalingMode};
pub use ops::DType;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::embedding::EmbeddingTable;
    pub use crate::error::{LayerError, LayerResult};
    pub use crate::initializer::{Initializer, VarianceScalingDistribution, VarianceScalingMode};
    pub use crate::ops::{self, DType};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use ndarray::{array, Array2, Array3};

    #[test]
    fn test_project_then_norm() {
        let x = Array3::<f32>::ones((2, 3, 4));
        let w = Initializer::fan_out(1.0).initialize(4, 8, Some(5));
        let projected = ops::project3(&x, &w).unwrap();
        assert_eq!(projected.dim(), (2, 3, 8));

        let normed = ops::layer_norm(&projected, 1e-5);
        for lane in normed.lanes(ndarray::Axis(2)) {
            let mean: f32 = lane.sum() / 8.0;
            assert!(mean.abs() < 1e-4);
        }
    }

    #[test]
    fn test_table_and_cast() {
        let table = EmbeddingTable::from_weights(array![[0.1f32, 0.2], [0.3, 0.4]]).unwrap();
        let mut out = table.lookup(&array![[0usize, 1]]).unwrap();
        ops::cast_inplace(&mut out, DType::Bf16);
        // bf16 rounding stays within ~0.4% for values of this magnitude
        assert!((out[[0, 0, 0]] - 0.1).abs() < 1e-3);
    }

    #[test]
    fn test_shape_errors_propagate() {
        let x = Array3::<f32>::ones((1, 2, 3));
        let w = Array2::<f32>::ones((4, 2));
        assert!(matches!(
            ops::project3(&x, &w),
            Err(LayerError::InvalidInputDimension { expected: 4, actual: 3 })
        ));
    }
}
