//! Rust implementation of a Support Vector Machine trained through its dual
//!
//! The dual problem `max W(a)` subject to `0 <= a_i <= C` and `Σ a_i y_i = 0`
//! is handed to a general constrained minimizer; the decision function is
//! recovered from the optimized multipliers.

pub mod api;
pub mod core;
pub mod dual;
pub mod kernel;
pub mod optimizer;
pub mod persistence;
pub mod recovery;
pub mod solver;
pub mod utils;

// Re-export main types for convenience
pub use crate::api::{Classifier, EvaluationMetrics, ModelInfo, ModelState, SVM};
pub use crate::core::error::*;
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::dual::{objective_function, ConstraintSet, DualObjective};
pub use crate::kernel::{
    linear_kernel, nonlinear_kernel, GaussianKernel, Kernel, KernelType, LinearKernel,
};
pub use crate::optimizer::{SVMOptimizer, TrainedSVM};
pub use crate::persistence::ModelSnapshot;
pub use crate::recovery::DecisionFunction;
pub use crate::solver::{AugmentedLagrangian, ConstrainedMinimizer};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
