//! Utility functions for SVM operations

/// Input validation shared by training, objective evaluation and scoring
pub mod validation {
    use crate::core::{Result, SVMError};
    use ndarray::{ArrayView1, ArrayView2};

    /// Validate that all labels are binary (-1 or +1)
    pub fn validate_binary_labels(y: ArrayView1<f64>) -> Result<()> {
        match y.iter().find(|&&label| label != 1.0 && label != -1.0) {
            Some(&label) => Err(SVMError::InvalidLabel(label)),
            None => Ok(()),
        }
    }

    /// Count positive and negative labels, plus their ratio
    pub fn check_label_balance(y: ArrayView1<f64>) -> (usize, usize, f64) {
        let positive_count = y.iter().filter(|&&l| l > 0.0).count();
        let negative_count = y.len() - positive_count;
        let balance_ratio = if negative_count == 0 {
            f64::INFINITY
        } else {
            positive_count as f64 / negative_count as f64
        };
        (positive_count, negative_count, balance_ratio)
    }

    /// Check that `x` has one row per label and at least one sample
    pub fn validate_training_data(x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(SVMError::shape("training labels", x.nrows(), y.len()));
        }
        if x.nrows() == 0 {
            return Err(SVMError::EmptyDataset);
        }
        if x.ncols() == 0 {
            return Err(SVMError::InvalidParameter(
                "samples must have at least one feature".to_string(),
            ));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(SVMError::InvalidParameter(
                "samples contain non-finite values".to_string(),
            ));
        }
        validate_binary_labels(y)
    }

    /// Check that `a`, `y` and the rows of `x` all describe the same samples
    pub fn validate_dual_inputs(
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        a: ArrayView1<f64>,
    ) -> Result<()> {
        if y.len() != x.nrows() {
            return Err(SVMError::shape("labels", x.nrows(), y.len()));
        }
        if a.len() != x.nrows() {
            return Err(SVMError::shape("multipliers", x.nrows(), a.len()));
        }
        Ok(())
    }

    /// Check that query samples have the training dimensionality and finite values
    pub fn validate_features(x: ArrayView2<f64>, n_features: usize) -> Result<()> {
        if x.ncols() != n_features {
            return Err(SVMError::shape("feature dimension", n_features, x.ncols()));
        }
        if let Some(value) = x.iter().find(|v| !v.is_finite()) {
            return Err(SVMError::InvalidParameter(format!(
                "query samples must be finite, got {value}"
            )));
        }
        Ok(())
    }
}
