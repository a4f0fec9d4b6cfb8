//! Linear kernel implementation

use crate::core::{Result, SVMError};
use crate::kernel::{check_batch_dims, Kernel, KernelType};
use ndarray::{Array2, ArrayView1, ArrayView2};

/// Linear kernel: K(x, y) = x^T * y
///
/// This is the simplest kernel function, computing the dot product between two vectors.
/// It is the only kernel for which the primal weight vector can be recovered explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearKernel;

impl LinearKernel {
    /// Create a new linear kernel
    pub fn new() -> Self {
        Self
    }
}

impl Kernel for LinearKernel {
    fn compute(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
        x.dot(&y)
    }

    fn matrix(&self, a: ArrayView2<f64>, b: ArrayView2<f64>) -> Result<Array2<f64>> {
        check_batch_dims(a, b)?;
        linear_kernel(a, b.t())
    }

    fn is_linear(&self) -> bool {
        true
    }

    fn kernel_type(&self) -> KernelType {
        KernelType::Linear
    }
}

/// Matrix product of A (m x n) and B (n x p), giving an m x p matrix
pub fn linear_kernel(a: ArrayView2<f64>, b: ArrayView2<f64>) -> Result<Array2<f64>> {
    if a.ncols() != b.nrows() {
        return Err(SVMError::shape("matrix product", a.ncols(), b.nrows()));
    }
    Ok(a.dot(&b))
}
