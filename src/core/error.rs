//! Error types for the dual SVM implementation

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SVMError {
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid label: expected -1 or +1, got {0}")]
    InvalidLabel(f64),

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("Optimizer did not converge after {iterations} iterations (constraint violation {violation:e}): {message}")]
    OptimizerNonConvergence {
        iterations: usize,
        violation: f64,
        message: String,
    },

    #[error("Degenerate fit: {0}")]
    DegenerateFit(String),

    #[error("Model not fitted")]
    NotFitted,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SVMError {
    /// Shorthand for a [`SVMError::ShapeMismatch`]
    pub fn shape(context: &'static str, expected: usize, actual: usize) -> Self {
        SVMError::ShapeMismatch {
            context,
            expected,
            actual,
        }
    }
}

pub type Result<T> = std::result::Result<T, SVMError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = SVMError::shape("labels", 4, 3);
        assert_eq!(
            err.to_string(),
            "Shape mismatch in labels: expected 4, got 3"
        );
    }

    #[test]
    fn test_non_convergence_message() {
        let err = SVMError::OptimizerNonConvergence {
            iterations: 10,
            violation: 0.5,
            message: "iteration budget exhausted".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("10 iterations"));
        assert!(text.contains("iteration budget exhausted"));
    }
}
