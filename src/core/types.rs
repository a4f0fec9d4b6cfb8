//! Core type definitions for the dual SVM

use crate::core::{Result, SVMError};
use serde::{Deserialize, Serialize};

/// Prediction result containing label and decision value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted class label (+1 or -1)
    pub label: f64,
    /// Raw decision function value
    pub decision_value: f64,
}

impl Prediction {
    /// Build a prediction from a raw decision value.
    ///
    /// A decision value of exactly zero lies on the separating hyperplane and
    /// is assigned to the positive class.
    pub fn from_decision(decision_value: f64) -> Self {
        Self {
            label: sign_label(decision_value),
            decision_value,
        }
    }

    /// Get confidence as absolute value of decision value
    pub fn confidence(&self) -> f64 {
        self.decision_value.abs()
    }
}

/// Map a decision value to a class label, sending `0.0` to `+1`.
pub fn sign_label(decision_value: f64) -> f64 {
    if decision_value >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// Summary of a single training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    /// Outer iterations used by the minimizer
    pub iterations: usize,
    /// Dual objective at the returned multipliers (the maximised quantity)
    pub dual_objective: f64,
    /// `sum(a_i * y_i)` at the returned multipliers
    pub equality_residual: f64,
    /// Largest constraint violation reported by the minimizer
    pub max_violation: f64,
    /// Number of samples with a multiplier above the support tolerance
    pub n_support_vectors: usize,
}

/// Configuration for the dual solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Regularization parameter (upper bound for every multiplier)
    pub c: f64,
    /// Iteration budget handed to the minimizer
    pub max_iterations: usize,
    /// Feasibility and stationarity tolerance
    pub tolerance: f64,
    /// Multipliers above this fraction of the largest multiplier mark support vectors
    pub support_tolerance: f64,
    /// L-BFGS iteration budget of each inner minimisation
    pub inner_max_iterations: usize,
    /// Initial penalty weight of the augmented Lagrangian
    pub rho_init: f64,
    /// Upper limit for the penalty weight
    pub rho_max: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iterations: 1000,
            tolerance: 1e-6,
            support_tolerance: 1e-5,
            inner_max_iterations: 1000,
            rho_init: 10.0,
            rho_max: 1e8,
        }
    }
}

impl SolverConfig {
    /// Check every parameter, reporting the first invalid one
    pub fn validate(&self) -> Result<()> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "C must be strictly positive, got: {}",
                self.c
            )));
        }
        if self.max_iterations == 0 {
            return Err(SVMError::InvalidParameter(
                "max_iterations must be positive".to_string(),
            ));
        }
        if self.inner_max_iterations == 0 {
            return Err(SVMError::InvalidParameter(
                "inner_max_iterations must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("tolerance", self.tolerance),
            ("support_tolerance", self.support_tolerance),
            ("rho_init", self.rho_init),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SVMError::InvalidParameter(format!(
                    "{name} must be strictly positive, got: {value}"
                )));
            }
        }
        if !(self.rho_max >= self.rho_init) {
            return Err(SVMError::InvalidParameter(format!(
                "rho_max ({}) must not be below rho_init ({})",
                self.rho_max, self.rho_init
            )));
        }
        Ok(())
    }
}
