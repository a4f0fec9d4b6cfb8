//! Core traits for the dual SVM implementation

use crate::core::{sign_label, Prediction, Result, SVMError};
use ndarray::{Array1, ArrayView1, ArrayView2};

/// Trained SVM model
pub trait SVMModel: Send + Sync {
    /// Raw decision values for every row of `x`
    fn decision_function(&self, x: ArrayView2<f64>) -> Result<Array1<f64>>;

    /// Get the number of support vectors
    fn n_support_vectors(&self) -> usize;

    /// Get the bias term
    fn bias(&self) -> f64;

    /// Class labels (+1 or -1) for every row of `x`
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(sign_label))
    }

    /// Predict a single sample
    fn predict_one(&self, sample: ArrayView1<f64>) -> Result<Prediction> {
        let row = sample.insert_axis(ndarray::Axis(0));
        let decision = self.decision_function(row)?;
        Ok(Prediction::from_decision(decision[0]))
    }

    /// Fraction of predictions that equal `y`
    fn score(&self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<f64> {
        if x.nrows() != y.len() {
            return Err(SVMError::shape("score labels", x.nrows(), y.len()));
        }
        if y.is_empty() {
            return Err(SVMError::EmptyDataset);
        }
        let predictions = self.predict(x)?;
        let correct = predictions
            .iter()
            .zip(y.iter())
            .filter(|(pred, actual)| pred == actual)
            .count();
        Ok(correct as f64 / y.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Predicts the sign of the first feature
    struct FirstFeature;

    impl SVMModel for FirstFeature {
        fn decision_function(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
            Ok(x.column(0).to_owned())
        }

        fn n_support_vectors(&self) -> usize {
            0
        }

        fn bias(&self) -> f64 {
            0.0
        }
    }

    #[test]
    fn test_default_predict_and_score() {
        let x = array![[1.0, 0.0], [-2.0, 0.0], [0.0, 5.0]];
        let model = FirstFeature;

        let labels = model.predict(x.view()).unwrap();
        assert_eq!(labels, array![1.0, -1.0, 1.0]);

        let all_positive = array![1.0, 1.0, 1.0];
        assert_eq!(model.score(x.view(), all_positive.view()).unwrap(), 2.0 / 3.0);
    }

    #[test]
    fn test_predict_one() {
        let model = FirstFeature;
        let pred = model.predict_one(array![-0.5, 3.0].view()).unwrap();
        assert_eq!(pred.label, -1.0);
        assert_eq!(pred.decision_value, -0.5);
    }

    #[test]
    fn test_score_shape_mismatch() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0];
        assert!(matches!(
            FirstFeature.score(x.view(), y.view()),
            Err(SVMError::ShapeMismatch { .. })
        ));
    }
}
