//! High-level API for Support Vector Machine operations
//!
//! This module provides the builder used to configure a classifier and the
//! [`Classifier`] itself, which tracks whether it has been fitted.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use dsvm::api::SVM;
//! use ndarray::array;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let x = array![[2.0, 2.0], [1.5, 2.5], [-2.0, -2.0], [-2.5, -1.5]];
//! let y = array![1.0, 1.0, -1.0, -1.0];
//!
//! let mut model = SVM::new().with_c(1.0).build()?;
//! model.fit(x.view(), y.view())?;
//!
//! let labels = model.predict(array![[3.0, 1.0]].view())?;
//! println!("Accuracy: {:.2}%", model.score(x.view(), y.view())? * 100.0);
//! # Ok(())
//! # }
//! ```

use crate::core::{FitReport, Prediction, Result, SVMError, SVMModel, SolverConfig};
use crate::kernel::{GaussianKernel, Kernel, KernelType, LinearKernel};
use crate::optimizer::{SVMOptimizer, TrainedSVM};
use crate::solver::{AugmentedLagrangian, ConstrainedMinimizer};
use log::warn;
use ndarray::{Array1, ArrayView1, ArrayView2};

/// High-level SVM interface with builder pattern
pub struct SVM<K: Kernel = LinearKernel> {
    kernel: K,
    config: SolverConfig,
}

impl SVM<LinearKernel> {
    /// Create a new SVM with linear kernel and default parameters
    pub fn new() -> Self {
        Self {
            kernel: LinearKernel::new(),
            config: SolverConfig::default(),
        }
    }
}

impl Default for SVM<LinearKernel> {
    fn default() -> Self {
        Self::new()
    }
}

impl SVM<GaussianKernel> {
    /// Create SVM with a Gaussian kernel of bandwidth `sigma`
    pub fn gaussian(sigma: f64) -> Result<Self> {
        Ok(Self::with_kernel(GaussianKernel::new(sigma)?))
    }
}

impl<K: Kernel> SVM<K> {
    /// Create SVM with custom kernel
    pub fn with_kernel(kernel: K) -> Self {
        Self {
            kernel,
            config: SolverConfig::default(),
        }
    }

    /// Set regularization parameter C
    pub fn with_c(mut self, c: f64) -> Self {
        self.config.c = c;
        self
    }

    /// Set maximum number of minimizer iterations
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set feasibility and stationarity tolerance
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    /// Set the multiplier threshold above which a sample is a support vector
    pub fn with_support_tolerance(mut self, support_tolerance: f64) -> Self {
        self.config.support_tolerance = support_tolerance;
        self
    }

    /// Set the step budget of each inner minimisation
    pub fn with_inner_max_iterations(mut self, inner_max_iterations: usize) -> Self {
        self.config.inner_max_iterations = inner_max_iterations;
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Validate the configuration and create an unfitted classifier
    pub fn build(self) -> Result<Classifier<K>> {
        Classifier::with_config(self.kernel, self.config)
    }

    /// Build and fit in one step
    pub fn fit(self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<Classifier<K>> {
        let mut classifier = self.build()?;
        classifier.fit(x, y)?;
        Ok(classifier)
    }
}

/// Lifecycle of a [`Classifier`]
#[derive(Debug, Clone)]
pub enum ModelState<K: Kernel> {
    /// No fit attempted yet
    Unfit,
    /// The last fit succeeded
    Fitted(TrainedSVM<K>),
    /// The last fit failed; holds the reason
    Failed(String),
}

/// Binary SVM classifier
///
/// Every call to [`Classifier::fit`] discards the previous state and solves
/// the dual problem from scratch. Prediction, scoring and the accessors
/// return [`SVMError::NotFitted`] unless the last fit succeeded.
pub struct Classifier<K: Kernel = LinearKernel, M: ConstrainedMinimizer = AugmentedLagrangian> {
    optimizer: SVMOptimizer<K, M>,
    state: ModelState<K>,
}

impl<K: Kernel> Classifier<K> {
    /// `construct(kernel, C, max_iter)`; other settings keep their defaults
    pub fn new(kernel: K, c: f64, max_iterations: usize) -> Result<Self> {
        let config = SolverConfig {
            c,
            max_iterations,
            ..SolverConfig::default()
        };
        Self::with_config(kernel, config)
    }

    pub fn with_config(kernel: K, config: SolverConfig) -> Result<Self> {
        Ok(Self {
            optimizer: SVMOptimizer::new(kernel, config)?,
            state: ModelState::Unfit,
        })
    }
}

impl<K: Kernel, M: ConstrainedMinimizer> Classifier<K, M> {
    /// Classifier whose dual problem is solved by `minimizer`
    pub fn with_minimizer(kernel: K, config: SolverConfig, minimizer: M) -> Result<Self> {
        Ok(Self {
            optimizer: SVMOptimizer::with_minimizer(kernel, config, minimizer)?,
            state: ModelState::Unfit,
        })
    }

    pub(crate) fn from_parts(optimizer: SVMOptimizer<K, M>, model: TrainedSVM<K>) -> Self {
        Self {
            optimizer,
            state: ModelState::Fitted(model),
        }
    }

    /// Fit on `x` (one sample per row) and labels `y` in {-1, +1}
    pub fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<&mut Self> {
        match self.optimizer.train(x, y) {
            Ok(model) => {
                self.state = ModelState::Fitted(model);
                Ok(self)
            }
            Err(e) => {
                warn!("fit failed: {e}");
                self.state = ModelState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    pub fn state(&self) -> &ModelState<K> {
        &self.state
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self.state, ModelState::Fitted(_))
    }

    /// The trained model behind a successful fit
    pub fn trained(&self) -> Result<&TrainedSVM<K>> {
        match &self.state {
            ModelState::Fitted(model) => Ok(model),
            ModelState::Unfit | ModelState::Failed(_) => Err(SVMError::NotFitted),
        }
    }

    /// Class labels (+1 or -1) for every row of `x`; a decision value of 0 maps to +1
    pub fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        self.trained()?.predict(x)
    }

    pub fn decision_function(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        self.trained()?.decision_function(x)
    }

    pub fn predict_one(&self, sample: ArrayView1<f64>) -> Result<Prediction> {
        self.trained()?.predict_one(sample)
    }

    /// Fraction of predictions equal to `y`
    pub fn score(&self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<f64> {
        self.trained()?.score(x, y)
    }

    /// Get detailed evaluation metrics
    pub fn evaluate_detailed(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
    ) -> Result<EvaluationMetrics> {
        let model = self.trained()?;
        if x.nrows() != y.len() {
            return Err(SVMError::shape("evaluation labels", x.nrows(), y.len()));
        }
        let predictions = model.predict(x)?;

        let mut tp = 0; // True positives
        let mut tn = 0; // True negatives
        let mut fp = 0; // False positives
        let mut fn_ = 0; // False negatives

        for (&pred, &actual) in predictions.iter().zip(y.iter()) {
            match (pred > 0.0, actual > 0.0) {
                (true, true) => tp += 1,
                (false, false) => tn += 1,
                (true, false) => fp += 1,
                (false, true) => fn_ += 1,
            }
        }

        Ok(EvaluationMetrics::new(tp, tn, fp, fn_))
    }

    /// Lagrange multipliers of the last successful fit
    pub fn multipliers(&self) -> Result<&Array1<f64>> {
        Ok(self.trained()?.alpha_values())
    }

    /// Weight vector; `None` for kernels without an input-space weight vector
    pub fn weights(&self) -> Result<Option<&Array1<f64>>> {
        Ok(self.trained()?.weights())
    }

    pub fn bias(&self) -> Result<f64> {
        Ok(self.trained()?.bias())
    }

    pub fn n_support_vectors(&self) -> Result<usize> {
        Ok(self.trained()?.n_support_vectors())
    }

    pub fn support_vector_indices(&self) -> Result<Vec<usize>> {
        Ok(self.trained()?.support_vector_indices())
    }

    pub fn report(&self) -> Result<&FitReport> {
        Ok(self.trained()?.report())
    }

    /// Get model information
    pub fn info(&self) -> Result<ModelInfo> {
        let model = self.trained()?;
        Ok(ModelInfo {
            kernel: model.kernel().kernel_type(),
            c: model.c(),
            n_support_vectors: model.n_support_vectors(),
            bias: model.bias(),
            support_vector_indices: model.support_vector_indices(),
            iterations: model.report().iterations,
        })
    }

    pub fn config(&self) -> &SolverConfig {
        self.optimizer.config()
    }

    pub fn kernel(&self) -> &K {
        self.optimizer.kernel()
    }
}

/// Detailed evaluation metrics
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationMetrics {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl EvaluationMetrics {
    fn new(tp: usize, tn: usize, fp: usize, fn_: usize) -> Self {
        Self {
            true_positives: tp,
            true_negatives: tn,
            false_positives: fp,
            false_negatives: fn_,
        }
    }

    /// Calculate accuracy: (TP + TN) / (TP + TN + FP + FN)
    pub fn accuracy(&self) -> f64 {
        let total =
            self.true_positives + self.true_negatives + self.false_positives + self.false_negatives;
        ratio(self.true_positives + self.true_negatives, total)
    }

    /// Calculate precision: TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// Calculate recall (sensitivity): TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// Calculate F1 score: 2 * (precision * recall) / (precision + recall)
    pub fn f1_score(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * (p * r) / (p + r)
        }
    }

    /// Calculate specificity: TN / (TN + FP)
    pub fn specificity(&self) -> f64 {
        ratio(self.true_negatives, self.true_negatives + self.false_positives)
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Model information
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub kernel: KernelType,
    pub c: f64,
    pub n_support_vectors: usize,
    pub bias: f64,
    pub support_vector_indices: Vec<usize>,
    pub iterations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{Problem, Solution};
    use ndarray::{array, Array2};

    fn line_data() -> (Array2<f64>, Array1<f64>) {
        (
            array![[2.0], [-2.0], [1.5], [-1.5], [1.8], [-1.8]],
            array![1.0, -1.0, 1.0, -1.0, 1.0, -1.0],
        )
    }

    /// Reports non-convergence without doing any work
    struct GiveUp;

    impl ConstrainedMinimizer for GiveUp {
        fn minimize(&self, _problem: &Problem<'_>, x0: &[f64], _max_iterations: usize) -> Result<Solution> {
            Ok(Solution {
                x: x0.to_vec(),
                objective: 0.0,
                iterations: 1,
                max_violation: 0.0,
                converged: false,
                message: "gave up".to_string(),
            })
        }
    }

    #[test]
    fn test_svm_builder_pattern() {
        let svm = SVM::new()
            .with_c(2.0)
            .with_tolerance(1e-5)
            .with_support_tolerance(1e-4)
            .with_max_iterations(5000);

        assert_eq!(svm.config().c, 2.0);
        assert_eq!(svm.config().tolerance, 1e-5);
        assert_eq!(svm.config().support_tolerance, 1e-4);
        assert_eq!(svm.config().max_iterations, 5000);
    }

    #[test]
    fn test_construct_validates_parameters() {
        assert!(Classifier::new(LinearKernel::new(), 1.0, 1000).is_ok());
        assert!(matches!(
            Classifier::new(LinearKernel::new(), 0.0, 1000),
            Err(SVMError::InvalidParameter(_))
        ));
        assert!(matches!(
            Classifier::new(LinearKernel::new(), 1.0, 0),
            Err(SVMError::InvalidParameter(_))
        ));
        assert!(matches!(
            SVM::gaussian(-0.5),
            Err(SVMError::InvalidParameter(_))
        ));
        assert!(matches!(
            SVM::new().with_c(-3.0).build(),
            Err(SVMError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_quick_training() {
        let (x, y) = line_data();
        let model = SVM::new()
            .fit(x.view(), y.view())
            .expect("Training should succeed");

        let prediction = model.predict_one(array![1.0].view()).unwrap();
        assert_eq!(prediction.label, 1.0);
        assert!(prediction.decision_value > 0.0);

        let info = model.info().unwrap();
        assert!(info.n_support_vectors > 0);
        assert_eq!(info.kernel, KernelType::Linear);
        assert_eq!(model.score(x.view(), y.view()).unwrap(), 1.0);
    }

    #[test]
    fn test_not_fitted_before_fit() {
        let model = SVM::new().build().unwrap();
        let x = array![[1.0]];
        assert!(!model.is_fitted());
        assert!(matches!(model.state(), ModelState::Unfit));
        assert!(matches!(model.predict(x.view()), Err(SVMError::NotFitted)));
        assert!(matches!(
            model.score(x.view(), array![1.0].view()),
            Err(SVMError::NotFitted)
        ));
        assert!(matches!(model.multipliers(), Err(SVMError::NotFitted)));
        assert!(matches!(model.bias(), Err(SVMError::NotFitted)));
    }

    #[test]
    fn test_failed_fit_then_recovery() {
        let (x, y) = line_data();
        let mut model = SVM::new().build().unwrap();

        assert!(matches!(
            model.fit(x.view(), array![1.0, -1.0].view()),
            Err(SVMError::ShapeMismatch { .. })
        ));
        assert!(matches!(model.state(), ModelState::Failed(_)));
        assert!(matches!(model.predict(x.view()), Err(SVMError::NotFitted)));

        model.fit(x.view(), y.view()).unwrap();
        assert!(model.is_fitted());
        assert_eq!(model.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn test_non_converged_fit_is_failed() {
        let (x, y) = line_data();
        let mut model =
            Classifier::with_minimizer(LinearKernel::new(), SolverConfig::default(), GiveUp).unwrap();
        assert!(matches!(
            model.fit(x.view(), y.view()),
            Err(SVMError::OptimizerNonConvergence { .. })
        ));
        match model.state() {
            ModelState::Failed(reason) => assert!(reason.contains("gave up")),
            other => panic!("expected failed state, got {other:?}"),
        }
    }

    #[test]
    fn test_refit_discards_previous_model() {
        let (x, y) = line_data();
        let mut model = SVM::new().build().unwrap();
        model.fit(x.view(), y.view()).unwrap();
        let first = model.multipliers().unwrap().clone();

        // Same data, flipped labels: the boundary must flip as well
        let flipped = y.mapv(|v| -v);
        model.fit(x.view(), flipped.view()).unwrap();
        assert_eq!(model.predict(x.view()).unwrap(), flipped);
        assert_eq!(model.multipliers().unwrap().len(), first.len());
    }

    #[test]
    fn test_evaluation_metrics() {
        let metrics = EvaluationMetrics::new(10, 5, 2, 3);

        assert_eq!(metrics.accuracy(), 0.75); // (10+5)/(10+5+2+3)
        assert_eq!(metrics.precision(), 10.0 / 12.0); // 10/(10+2)
        assert_eq!(metrics.recall(), 10.0 / 13.0); // 10/(10+3)
        assert!(metrics.f1_score() > 0.0);
        assert_eq!(metrics.specificity(), 5.0 / 7.0); // 5/(5+2)

        let empty = EvaluationMetrics::new(0, 0, 0, 0);
        assert_eq!(empty.accuracy(), 0.0);
        assert_eq!(empty.f1_score(), 0.0);
    }

    #[test]
    fn test_evaluate_detailed() {
        let (x, y) = line_data();
        let model = SVM::new().fit(x.view(), y.view()).unwrap();

        let metrics = model.evaluate_detailed(x.view(), y.view()).unwrap();
        assert_eq!(metrics.true_positives, 3);
        assert_eq!(metrics.true_negatives, 3);
        assert_eq!(metrics.accuracy(), 1.0);

        // Scored against the opposite labels every prediction is wrong
        let flipped = y.mapv(|v| -v);
        let metrics = model.evaluate_detailed(x.view(), flipped.view()).unwrap();
        assert_eq!(metrics.false_positives, 3);
        assert_eq!(metrics.false_negatives, 3);
        assert_eq!(metrics.accuracy(), 0.0);
    }
}
