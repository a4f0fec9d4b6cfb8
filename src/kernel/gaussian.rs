//! Gaussian (radial basis function) kernel implementation
//!
//! The kernel is defined as: K(x, y) = exp(-||x - y||² / (2σ²))
//! where σ (sigma) is the bandwidth controlling the locality of similarity.

use crate::core::{Result, SVMError};
use crate::kernel::{check_batch_dims, Kernel, KernelType};
use ndarray::{Array2, ArrayView1, ArrayView2};

/// Bandwidth used when none is given
pub const DEFAULT_SIGMA: f64 = 0.5;

/// Gaussian kernel: K(x, y) = exp(-||x - y||² / (2σ²))
///
/// The sigma parameter controls the "reach" of each training example:
/// - Small sigma: only close points are similar (potential overfitting)
/// - Large sigma: distant points stay similar (potential underfitting)
#[derive(Debug, Clone, Copy)]
pub struct GaussianKernel {
    sigma: f64,
}

impl GaussianKernel {
    /// Create a new Gaussian kernel with the given bandwidth
    ///
    /// # Errors
    /// Returns `InvalidParameter` unless sigma is finite and strictly positive
    pub fn new(sigma: f64) -> Result<Self> {
        validate_sigma(sigma)?;
        Ok(Self { sigma })
    }

    /// Get the bandwidth
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    fn gamma(&self) -> f64 {
        1.0 / (2.0 * self.sigma * self.sigma)
    }
}

impl Default for GaussianKernel {
    /// Gaussian kernel with sigma = 0.5
    fn default() -> Self {
        Self {
            sigma: DEFAULT_SIGMA,
        }
    }
}

impl Kernel for GaussianKernel {
    fn compute(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
        (-self.gamma() * squared_euclidean_distance(x, y)).exp()
    }

    fn matrix(&self, a: ArrayView2<f64>, b: ArrayView2<f64>) -> Result<Array2<f64>> {
        check_batch_dims(a, b)?;
        let gamma = self.gamma();
        // Differences are taken per pair; expanding the norms cancels far from the origin
        Ok(Array2::from_shape_fn((a.nrows(), b.nrows()), |(i, j)| {
            (-gamma * squared_euclidean_distance(a.row(i), b.row(j))).exp()
        }))
    }

    fn kernel_type(&self) -> KernelType {
        KernelType::Gaussian { sigma: self.sigma }
    }
}

/// Gaussian kernel value for a pair of feature vectors, a scalar in (0, 1]
pub fn nonlinear_kernel(x1: ArrayView1<f64>, x2: ArrayView1<f64>, sigma: f64) -> Result<f64> {
    validate_sigma(sigma)?;
    if x1.len() != x2.len() {
        return Err(SVMError::shape("kernel feature dimension", x1.len(), x2.len()));
    }
    let dist_sq = squared_euclidean_distance(x1, x2);
    Ok((-dist_sq / (2.0 * sigma * sigma)).exp())
}

/// Pairwise Gaussian similarities between the rows of `a` and the rows of `b`
pub fn gaussian_kernel_matrix(
    a: ArrayView2<f64>,
    b: ArrayView2<f64>,
    sigma: f64,
) -> Result<Array2<f64>> {
    GaussianKernel::new(sigma)?.matrix(a, b)
}

fn validate_sigma(sigma: f64) -> Result<()> {
    if sigma.is_finite() && sigma > 0.0 {
        Ok(())
    } else {
        Err(SVMError::InvalidParameter(format!(
            "sigma must be strictly positive, got: {sigma}"
        )))
    }
}

fn squared_euclidean_distance(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    x.iter()
        .zip(y.iter())
        .map(|(xi, yi)| (xi - yi) * (xi - yi))
        .sum()
}
