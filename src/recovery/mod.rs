//! Recovery of the decision function from optimized multipliers
//!
//! With the linear kernel the weight vector `w = Σ a_i y_i x_i` exists in input
//! space, giving `f(x) = <w, x> + b`. Any other kernel keeps the dual form
//! `f(x) = Σ_sv a_i y_i K(x_i, x) + b`. In both cases
//! `b = mean over support vectors of (y_i - f(x_i) + b)`.

use crate::core::{Result, SVMError};
use crate::kernel::Kernel;
use crate::utils::validation::{validate_dual_inputs, validate_features};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// `a_i > tolerance * max_j a_j` for every i
///
/// The threshold follows the scale of the multipliers, which shrink with the
/// square of the feature scale. Nothing is marked when no multiplier is positive.
pub fn support_mask(a: ArrayView1<f64>, tolerance: f64) -> Array1<bool> {
    let largest = a.fold(0.0_f64, |acc, &ai| acc.max(ai));
    if largest <= 0.0 {
        return Array1::from_elem(a.len(), false);
    }
    let threshold = tolerance * largest;
    a.mapv(|ai| ai > threshold)
}

/// Support vectors of a fit. A feasible non-zero solution of `Σ a_i y_i = 0`
/// has positive multipliers in both classes; anything else is solver noise
/// around `a = 0`.
fn support_indices(a: ArrayView1<f64>, y: ArrayView1<f64>, tolerance: f64) -> Result<Vec<usize>> {
    let indices: Vec<usize> = support_mask(a, tolerance)
        .iter()
        .enumerate()
        .filter_map(|(i, &is_support)| is_support.then_some(i))
        .collect();
    if indices.is_empty() {
        return Err(SVMError::DegenerateFit(
            "no multiplier is positive, so the bias is undefined".to_string(),
        ));
    }
    let positive = indices.iter().filter(|&&i| y[i] > 0.0).count();
    if positive == 0 || positive == indices.len() {
        return Err(SVMError::DegenerateFit(format!(
            "all {} support vectors share one label, so the multipliers do not balance",
            indices.len()
        )));
    }
    Ok(indices)
}

/// `w = Σ a_i y_i x_i`
pub fn primal_weights(
    a: ArrayView1<f64>,
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
) -> Result<Array1<f64>> {
    validate_dual_inputs(x, y, a)?;
    Ok(x.t().dot(&(&a * &y)))
}

/// `b = mean over support vectors of (y_i - <x_i, w>)`
pub fn primal_bias(
    a: ArrayView1<f64>,
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    w: ArrayView1<f64>,
    tolerance: f64,
) -> Result<f64> {
    validate_dual_inputs(x, y, a)?;
    validate_features(x, w.len())?;
    let support = support_indices(a, y, tolerance)?;
    let total: f64 = support.iter().map(|&i| y[i] - x.row(i).dot(&w)).sum();
    Ok(total / support.len() as f64)
}

/// `b = mean over support vectors of (y_i - Σ_j a_j y_j K(x_j, x_i))`
pub fn dual_bias(
    a: ArrayView1<f64>,
    y: ArrayView1<f64>,
    gram: ArrayView2<f64>,
    tolerance: f64,
) -> Result<f64> {
    if y.len() != a.len() {
        return Err(SVMError::shape("labels", a.len(), y.len()));
    }
    if gram.dim() != (a.len(), a.len()) {
        return Err(SVMError::shape("kernel matrix", a.len(), gram.nrows()));
    }
    let support = support_indices(a, y, tolerance)?;
    let ay = &a * &y;
    let total: f64 = support
        .iter()
        .map(|&i| y[i] - gram.column(i).dot(&ay))
        .sum();
    Ok(total / support.len() as f64)
}

/// Decision function recovered after a fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionFunction {
    /// f(x) = <w, x> + b
    Primal { weights: Array1<f64>, bias: f64 },
    /// f(x) = Σ coefficients_i K(support_vectors_i, x) + b, with coefficients a_i y_i
    Dual {
        support_vectors: Array2<f64>,
        coefficients: Array1<f64>,
        bias: f64,
    },
}

impl DecisionFunction {
    /// Recover the decision function for a kernel from multipliers `a`.
    ///
    /// `gram` must be `kernel.matrix(x, x)`; it is only read on the dual path.
    pub fn recover<K>(
        kernel: &K,
        a: ArrayView1<f64>,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        gram: ArrayView2<f64>,
        tolerance: f64,
    ) -> Result<Self>
    where
        K: Kernel + ?Sized,
    {
        if kernel.is_linear() {
            let weights = primal_weights(a, x, y)?;
            let bias = primal_bias(a, x, y, weights.view(), tolerance)?;
            return Ok(DecisionFunction::Primal { weights, bias });
        }

        validate_dual_inputs(x, y, a)?;
        let bias = dual_bias(a, y, gram, tolerance)?;
        let support = support_indices(a, y, tolerance)?;
        let support_vectors = x.select(Axis(0), &support);
        let coefficients: Array1<f64> = support.iter().map(|&i| a[i] * y[i]).collect();
        Ok(DecisionFunction::Dual {
            support_vectors,
            coefficients,
            bias,
        })
    }

    /// Decision values for every row of `x`
    pub fn evaluate<K>(&self, kernel: &K, x: ArrayView2<f64>) -> Result<Array1<f64>>
    where
        K: Kernel + ?Sized,
    {
        validate_features(x, self.n_features())?;
        match self {
            DecisionFunction::Primal { weights, bias } => Ok(x.dot(weights) + *bias),
            DecisionFunction::Dual {
                support_vectors,
                coefficients,
                bias,
            } => {
                let k = kernel.matrix(x, support_vectors.view())?;
                Ok(k.dot(coefficients) + *bias)
            }
        }
    }

    pub fn bias(&self) -> f64 {
        match self {
            DecisionFunction::Primal { bias, .. } | DecisionFunction::Dual { bias, .. } => *bias,
        }
    }

    /// Explicit weight vector, only available for the linear kernel
    pub fn weights(&self) -> Option<&Array1<f64>> {
        match self {
            DecisionFunction::Primal { weights, .. } => Some(weights),
            DecisionFunction::Dual { .. } => None,
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            DecisionFunction::Primal { weights, .. } => weights.len(),
            DecisionFunction::Dual {
                support_vectors, ..
            } => support_vectors.ncols(),
        }
    }
}
