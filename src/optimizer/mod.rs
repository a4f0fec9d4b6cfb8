//! Training pipeline for the dual SVM
//!
//! This module wires kernels, the dual objective, the constraint set and a
//! [`ConstrainedMinimizer`] together, then recovers the decision function.

use crate::core::{FitReport, Result, SVMError, SVMModel, SolverConfig};
use crate::dual::{ConstraintSet, DualObjective};
use crate::kernel::Kernel;
use crate::recovery::{support_mask, DecisionFunction};
use crate::solver::{AugmentedLagrangian, ConstrainedMinimizer, Problem};
use crate::utils::validation::{check_label_balance, validate_training_data};
use log::{debug, info, warn};
use ndarray::{Array1, ArrayView1, ArrayView2};
use std::sync::Arc;

/// High-level SVM optimizer that integrates kernel functions and a constrained minimizer
pub struct SVMOptimizer<K: Kernel, M: ConstrainedMinimizer = AugmentedLagrangian> {
    kernel: Arc<K>,
    config: SolverConfig,
    minimizer: M,
}

impl<K: Kernel> SVMOptimizer<K> {
    /// Create a new SVM optimizer with the given kernel and configuration
    pub fn new(kernel: K, config: SolverConfig) -> Result<Self> {
        config.validate()?;
        let minimizer = AugmentedLagrangian::from_config(&config);
        Ok(Self {
            kernel: Arc::new(kernel),
            config,
            minimizer,
        })
    }

    /// Create a new SVM optimizer with default configuration
    pub fn with_kernel(kernel: K) -> Self {
        Self {
            kernel: Arc::new(kernel),
            config: SolverConfig::default(),
            minimizer: AugmentedLagrangian::default(),
        }
    }
}

impl<K: Kernel, M: ConstrainedMinimizer> SVMOptimizer<K, M> {
    /// Create an optimizer that delegates the dual problem to `minimizer`
    pub fn with_minimizer(kernel: K, config: SolverConfig, minimizer: M) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            kernel: Arc::new(kernel),
            config,
            minimizer,
        })
    }

    /// Solve the dual problem for `x` (one sample per row) and labels `y` in {-1, +1}
    pub fn train(&self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<TrainedSVM<K>> {
        validate_training_data(x, y)?;
        let (positive, negative, _) = check_label_balance(y);
        info!(
            "training SVM: {} samples, {} features ({} positive, {} negative), kernel={}, C={}",
            x.nrows(),
            x.ncols(),
            positive,
            negative,
            self.kernel.kernel_type(),
            self.config.c
        );

        let objective = DualObjective::new(x, y, self.kernel.as_ref())?;
        let constraint_set = ConstraintSet::new(self.config.c, y)?;

        // The minimizer minimises, so it receives -W(a) and -∇W(a)
        let problem = Problem::new(|a: &[f64]| -objective.value_unchecked(ArrayView1::from(a)))
            .with_gradient(|a: &[f64]| {
                objective
                    .gradient_unchecked(ArrayView1::from(a))
                    .iter()
                    .map(|g| -g)
                    .collect()
            })
            .with_constraints(constraint_set.constraints())
            .with_bounds(constraint_set.bounds()?);

        let initial_guess = vec![0.0; x.nrows()];
        let solution = self
            .minimizer
            .minimize(&problem, &initial_guess, self.config.max_iterations)?;
        debug!(
            "minimizer finished: converged={} iterations={} violation={:.3e}",
            solution.converged, solution.iterations, solution.max_violation
        );

        if !solution.converged {
            warn!(
                "dual problem not solved within {} iterations: {}",
                self.config.max_iterations, solution.message
            );
            return Err(SVMError::OptimizerNonConvergence {
                iterations: solution.iterations,
                violation: solution.max_violation,
                message: solution.message,
            });
        }
        if solution.x.len() != x.nrows() {
            return Err(SVMError::shape("minimizer result", x.nrows(), solution.x.len()));
        }

        let equality_residual = constraint_set.equality(&solution.x);
        let alpha = Array1::from(solution.x);
        let decision = DecisionFunction::recover(
            self.kernel.as_ref(),
            alpha.view(),
            x,
            y,
            objective.gram().view(),
            self.config.support_tolerance,
        )
        .map_err(|e| {
            warn!("parameter recovery failed: {e}");
            e
        })?;

        let support = support_mask(alpha.view(), self.config.support_tolerance);
        let report = FitReport {
            iterations: solution.iterations,
            dual_objective: objective.value_unchecked(alpha.view()),
            equality_residual,
            max_violation: solution.max_violation,
            n_support_vectors: support.iter().filter(|&&s| s).count(),
        };
        info!(
            "training finished: {} support vectors, bias={:.6}, dual objective={:.6}, {} iterations",
            report.n_support_vectors,
            decision.bias(),
            report.dual_objective,
            report.iterations
        );

        Ok(TrainedSVM {
            kernel: Arc::clone(&self.kernel),
            alpha,
            support,
            decision,
            c: self.config.c,
            report,
        })
    }

    /// Get the optimizer configuration
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Get the kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub(crate) fn kernel_arc(&self) -> Arc<K> {
        Arc::clone(&self.kernel)
    }

    /// Get the minimizer
    pub fn minimizer(&self) -> &M {
        &self.minimizer
    }
}

/// A trained SVM model that can make predictions
#[derive(Debug, Clone)]
pub struct TrainedSVM<K: Kernel> {
    kernel: Arc<K>,
    alpha: Array1<f64>,
    support: Array1<bool>,
    decision: DecisionFunction,
    c: f64,
    report: FitReport,
}

impl<K: Kernel> TrainedSVM<K> {
    /// Reassemble a model from stored parts
    pub(crate) fn from_parts(
        kernel: Arc<K>,
        alpha: Array1<f64>,
        decision: DecisionFunction,
        config: &SolverConfig,
        report: FitReport,
    ) -> Self {
        let support = support_mask(alpha.view(), config.support_tolerance);
        Self {
            kernel,
            alpha,
            support,
            decision,
            c: config.c,
            report,
        }
    }

    /// All Lagrange multipliers, one per training sample
    pub fn alpha_values(&self) -> &Array1<f64> {
        &self.alpha
    }

    /// `true` for training samples that are support vectors
    pub fn support_mask(&self) -> &Array1<bool> {
        &self.support
    }

    /// Get the indices of support vectors in the original training set
    pub fn support_vector_indices(&self) -> Vec<usize> {
        self.support
            .iter()
            .enumerate()
            .filter_map(|(i, &s)| s.then_some(i))
            .collect()
    }

    /// Explicit weight vector; `None` unless the kernel is linear
    pub fn weights(&self) -> Option<&Array1<f64>> {
        self.decision.weights()
    }

    pub fn decision(&self) -> &DecisionFunction {
        &self.decision
    }

    pub fn report(&self) -> &FitReport {
        &self.report
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Regularization constant the model was trained with
    pub fn c(&self) -> f64 {
        self.c
    }
}

impl<K: Kernel> SVMModel for TrainedSVM<K> {
    fn decision_function(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        self.decision.evaluate(self.kernel.as_ref(), x)
    }

    fn n_support_vectors(&self) -> usize {
        self.report.n_support_vectors
    }

    fn bias(&self) -> f64 {
        self.decision.bias()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{GaussianKernel, LinearKernel};
    use crate::solver::Solution;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    fn separable() -> (Array2<f64>, Array1<f64>) {
        (
            array![[2.0, 2.0], [1.5, 2.5], [2.5, 1.0], [-2.0, -2.0], [-1.5, -2.5], [-2.5, -1.0]],
            array![1.0, 1.0, 1.0, -1.0, -1.0, -1.0],
        )
    }

    /// Returns a fixed point without looking at the problem
    struct FixedMinimizer {
        x: Vec<f64>,
        converged: bool,
    }

    impl ConstrainedMinimizer for FixedMinimizer {
        fn minimize(&self, _problem: &Problem<'_>, _x0: &[f64], max_iterations: usize) -> Result<Solution> {
            Ok(Solution {
                objective: 0.0,
                x: self.x.clone(),
                iterations: max_iterations,
                max_violation: 0.0,
                converged: self.converged,
                message: "fixed".to_string(),
            })
        }
    }

    #[test]
    fn test_svm_optimizer_creation() {
        let config = SolverConfig {
            c: 2.0,
            ..SolverConfig::default()
        };
        let optimizer = SVMOptimizer::new(LinearKernel::new(), config).unwrap();
        assert_eq!(optimizer.config().c, 2.0);
        assert_eq!(optimizer.minimizer().tolerance, 1e-6);

        let bad = SolverConfig {
            c: -1.0,
            ..SolverConfig::default()
        };
        assert!(matches!(
            SVMOptimizer::new(LinearKernel::new(), bad),
            Err(SVMError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_svm_training_simple_case() {
        let (x, y) = separable();
        let optimizer = SVMOptimizer::with_kernel(LinearKernel::new());
        let model = optimizer
            .train(x.view(), y.view())
            .expect("Training should succeed");

        assert!(model.n_support_vectors() > 0);
        assert_eq!(model.alpha_values().len(), 6);
        assert!(model.weights().is_some());
        assert_eq!(model.predict(x.view()).unwrap(), y);

        let report = model.report();
        assert!(report.equality_residual.abs() <= 1e-4);
        assert!(report.dual_objective > 0.0);
        for &a in model.alpha_values() {
            assert!(a >= 0.0 && a <= 1.0);
        }
    }

    #[test]
    fn test_support_vector_access() {
        let (x, y) = separable();
        let model = SVMOptimizer::with_kernel(LinearKernel::new())
            .train(x.view(), y.view())
            .unwrap();

        let indices = model.support_vector_indices();
        assert_eq!(indices.len(), model.n_support_vectors());
        for &idx in &indices {
            assert!(idx < 6);
            assert!(model.alpha_values()[idx] > 0.0);
            assert!(model.support_mask()[idx]);
        }
    }

    #[test]
    fn test_gaussian_training_keeps_dual_form() {
        let (x, y) = separable();
        let model = SVMOptimizer::with_kernel(GaussianKernel::new(1.0).unwrap())
            .train(x.view(), y.view())
            .unwrap();
        assert!(model.weights().is_none());
        assert_eq!(model.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn test_non_convergence_is_an_error() {
        let (x, y) = separable();
        let minimizer = FixedMinimizer {
            x: vec![0.1; 6],
            converged: false,
        };
        let optimizer =
            SVMOptimizer::with_minimizer(LinearKernel::new(), SolverConfig::default(), minimizer)
                .unwrap();
        assert!(matches!(
            optimizer.train(x.view(), y.view()),
            Err(SVMError::OptimizerNonConvergence { iterations: 1000, .. })
        ));
    }

    #[test]
    fn test_zero_multipliers_are_degenerate() {
        let (x, y) = separable();
        let minimizer = FixedMinimizer {
            x: vec![0.0; 6],
            converged: true,
        };
        let optimizer =
            SVMOptimizer::with_minimizer(LinearKernel::new(), SolverConfig::default(), minimizer)
                .unwrap();
        assert!(matches!(
            optimizer.train(x.view(), y.view()),
            Err(SVMError::DegenerateFit(_))
        ));
    }

    #[test]
    fn test_wrong_length_from_minimizer() {
        let (x, y) = separable();
        let minimizer = FixedMinimizer {
            x: vec![0.5; 2],
            converged: true,
        };
        let optimizer =
            SVMOptimizer::with_minimizer(LinearKernel::new(), SolverConfig::default(), minimizer)
                .unwrap();
        assert!(matches!(
            optimizer.train(x.view(), y.view()),
            Err(SVMError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_input_validation_happens_first() {
        let (x, _) = separable();
        let optimizer = SVMOptimizer::with_kernel(LinearKernel::new());
        assert!(matches!(
            optimizer.train(x.view(), array![1.0, -1.0].view()),
            Err(SVMError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            optimizer.train(x.view(), array![1.0, -1.0, 1.0, -1.0, 1.0, 3.0].view()),
            Err(SVMError::InvalidLabel(_))
        ));
    }

    #[test]
    fn test_two_point_problem_matches_closed_form() {
        // x = ±1: a = (0.5, 0.5), w = 1, b = 0
        let x = array![[1.0], [-1.0]];
        let y = array![1.0, -1.0];
        let model = SVMOptimizer::with_kernel(LinearKernel::new())
            .train(x.view(), y.view())
            .unwrap();

        assert_abs_diff_eq!(model.alpha_values()[0], 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(model.alpha_values()[1], 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(model.weights().unwrap()[0], 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(model.bias(), 0.0, epsilon = 1e-4);
    }
}
