//! Kernel trait definition

use crate::core::{Result, SVMError};
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Identifies a kernel and its parameters, for reports and snapshots
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KernelType {
    Linear,
    Gaussian { sigma: f64 },
}

impl std::fmt::Display for KernelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KernelType::Linear => write!(f, "linear"),
            KernelType::Gaussian { sigma } => write!(f, "gaussian(sigma={sigma})"),
        }
    }
}

/// Kernel function trait
///
/// A kernel function K(x, y) must satisfy Mercer's condition to be valid for SVM.
/// Samples are the rows of a matrix; `matrix` builds the pairwise similarity of
/// two sample batches, which is what the dual objective and the dual decision
/// function consume.
pub trait Kernel: Send + Sync {
    /// Compute kernel value K(x, y)
    ///
    /// # Panics
    /// May panic if `x` and `y` differ in length; `matrix` checks this first.
    fn compute(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64;

    /// Pairwise kernel matrix: entry (i, j) is K(a_i, b_j)
    fn matrix(&self, a: ArrayView2<f64>, b: ArrayView2<f64>) -> Result<Array2<f64>> {
        check_batch_dims(a, b)?;
        Ok(Array2::from_shape_fn((a.nrows(), b.nrows()), |(i, j)| {
            self.compute(a.row(i), b.row(j))
        }))
    }

    /// Whether K(x, y) is the plain inner product, so that an explicit weight
    /// vector exists in input space
    fn is_linear(&self) -> bool {
        false
    }

    /// Kernel identity
    fn kernel_type(&self) -> KernelType;
}

/// Both batches must share the feature dimension
pub(crate) fn check_batch_dims(a: ArrayView2<f64>, b: ArrayView2<f64>) -> Result<()> {
    if a.ncols() != b.ncols() {
        return Err(SVMError::shape(
            "kernel feature dimension",
            a.ncols(),
            b.ncols(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Counts shared nonzero coordinates
    struct OverlapKernel;

    impl Kernel for OverlapKernel {
        fn compute(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
            x.iter()
                .zip(y.iter())
                .filter(|(a, b)| **a != 0.0 && **b != 0.0)
                .count() as f64
        }

        fn kernel_type(&self) -> KernelType {
            KernelType::Linear
        }
    }

    #[test]
    fn test_default_matrix_is_pairwise() {
        let a = array![[1.0, 0.0, 1.0], [0.0, 1.0, 0.0]];
        let b = array![[1.0, 1.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 0.0]];
        let k = OverlapKernel.matrix(a.view(), b.view()).unwrap();
        assert_eq!(k, array![[2.0, 1.0, 0.0], [1.0, 0.0, 0.0]]);
        assert!(!OverlapKernel.is_linear());
    }

    #[test]
    fn test_default_matrix_dimension_mismatch() {
        let a = array![[1.0, 0.0]];
        let b = array![[1.0, 0.0, 1.0]];
        assert!(matches!(
            OverlapKernel.matrix(a.view(), b.view()),
            Err(SVMError::ShapeMismatch { expected: 2, actual: 3, .. })
        ));
    }

    #[test]
    fn test_kernel_type_display() {
        assert_eq!(KernelType::Linear.to_string(), "linear");
        assert_eq!(
            KernelType::Gaussian { sigma: 0.5 }.to_string(),
            "gaussian(sigma=0.5)"
        );
    }
}
