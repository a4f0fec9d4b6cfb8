//! The SVM dual objective
//!
//! W(a) = Σ a_i - ½ Σ_i Σ_j a_i a_j y_i y_j K(x_i, x_j)
//!
//! Training maximises W over the feasible multipliers.

use crate::core::{Result, SVMError};
use crate::kernel::Kernel;
use crate::utils::validation::validate_dual_inputs;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Value of the dual objective for multipliers `a`.
///
/// `a` may be any real vector; the minimizer probes infeasible points too.
/// The kernel matrix is rebuilt on every call, use [`DualObjective`] when
/// evaluating repeatedly on the same data.
pub fn objective_function<K>(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    a: ArrayView1<f64>,
    kernel: &K,
) -> Result<f64>
where
    K: Kernel + ?Sized,
{
    validate_dual_inputs(x, y, a)?;
    let k = kernel.matrix(x, x)?;

    // (a ⊙ y) as a column vector, so that ay * ayᵗ is the n x n outer product
    let ay = (&a * &y).insert_axis(Axis(1));
    let term1 = a.sum();
    let term2 = (ay.dot(&ay.t()) * &k).sum();
    Ok(term1 - 0.5 * term2)
}

/// Dual objective with the kernel matrix computed once for a training set
#[derive(Debug, Clone)]
pub struct DualObjective {
    gram: Array2<f64>,
    /// Q_ij = y_i y_j K(x_i, x_j)
    q: Array2<f64>,
}

impl DualObjective {
    pub fn new<K>(x: ArrayView2<f64>, y: ArrayView1<f64>, kernel: &K) -> Result<Self>
    where
        K: Kernel + ?Sized,
    {
        if y.len() != x.nrows() {
            return Err(SVMError::shape("labels", x.nrows(), y.len()));
        }
        let gram = kernel.matrix(x, x)?;
        let yy = y.insert_axis(Axis(1)).dot(&y.insert_axis(Axis(0)));
        let q = yy * &gram;
        Ok(Self { gram, q })
    }

    /// Number of multipliers
    pub fn len(&self) -> usize {
        self.q.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.q.nrows() == 0
    }

    /// K(X, X)
    pub fn gram(&self) -> &Array2<f64> {
        &self.gram
    }

    pub fn value(&self, a: ArrayView1<f64>) -> Result<f64> {
        self.check_len(a)?;
        Ok(self.value_unchecked(a))
    }

    /// ∇W(a) = 1 - Q a
    pub fn gradient(&self, a: ArrayView1<f64>) -> Result<Array1<f64>> {
        self.check_len(a)?;
        Ok(self.gradient_unchecked(a))
    }

    /// # Panics
    /// Panics if `a.len()` differs from [`DualObjective::len`]
    pub(crate) fn value_unchecked(&self, a: ArrayView1<f64>) -> f64 {
        a.sum() - 0.5 * a.dot(&self.q.dot(&a))
    }

    /// # Panics
    /// Panics if `a.len()` differs from [`DualObjective::len`]
    pub(crate) fn gradient_unchecked(&self, a: ArrayView1<f64>) -> Array1<f64> {
        self.q.dot(&a).mapv(|qa| 1.0 - qa)
    }

    fn check_len(&self, a: ArrayView1<f64>) -> Result<()> {
        if a.len() != self.len() {
            return Err(SVMError::shape("multipliers", self.len(), a.len()));
        }
        Ok(())
    }
}
