//! Feasible region of the dual problem
//!
//! - non-negativity: a_i >= 0
//! - upper bound:    C - a_i >= 0
//! - equality:       Σ a_i y_i = 0
//!
//! Inequalities are expressed as residuals that must stay non-negative and the
//! equality as a residual that must vanish.

use crate::core::{Result, SVMError};
use crate::solver::{Bounds, Constraint};
use crate::utils::validation::validate_binary_labels;
use ndarray::{Array1, ArrayView1};

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSet {
    c: f64,
    labels: Array1<f64>,
}

impl ConstraintSet {
    pub fn new(c: f64, labels: ArrayView1<f64>) -> Result<Self> {
        if !(c.is_finite() && c > 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "C must be strictly positive, got: {c}"
            )));
        }
        validate_binary_labels(labels)?;
        Ok(Self {
            c,
            labels: labels.to_owned(),
        })
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    /// Number of multipliers constrained
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `a_i` for every i
    pub fn non_negativity(&self, a: &[f64]) -> Vec<f64> {
        a.to_vec()
    }

    /// `C - a_i` for every i
    pub fn upper_bound(&self, a: &[f64]) -> Vec<f64> {
        a.iter().map(|ai| self.c - ai).collect()
    }

    /// `Σ a_i y_i`
    pub fn equality(&self, a: &[f64]) -> f64 {
        a.iter().zip(self.labels.iter()).map(|(ai, yi)| ai * yi).sum()
    }

    /// Largest violation over the three constraints
    pub fn max_violation(&self, a: &[f64]) -> f64 {
        let box_violation = a
            .iter()
            .fold(0.0_f64, |acc, &ai| acc.max(-ai).max(ai - self.c));
        box_violation.max(self.equality(a).abs())
    }

    pub fn is_feasible(&self, a: &[f64], tolerance: f64) -> bool {
        a.len() == self.len() && self.max_violation(a) <= tolerance
    }

    /// The three constraints in the form a [`crate::solver::ConstrainedMinimizer`] consumes
    pub fn constraints(&self) -> Vec<Constraint<'_>> {
        vec![
            Constraint::inequality("non_negativity", move |a: &[f64]| self.non_negativity(a))
                .with_jacobian_transpose(|_a, v| v.to_vec()),
            Constraint::inequality("upper_bound", move |a: &[f64]| self.upper_bound(a))
                .with_jacobian_transpose(|_a, v| v.iter().map(|vi| -vi).collect()),
            Constraint::equality("label_balance", move |a: &[f64]| vec![self.equality(a)])
                .with_jacobian_transpose(move |_a, v| {
                    self.labels.iter().map(|yi| yi * v[0]).collect()
                }),
        ]
    }

    /// The box `0 <= a_i <= C`, the first two constraints as explicit bounds
    pub fn bounds(&self) -> Result<Bounds> {
        Bounds::uniform(self.len(), 0.0, self.c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::ConstraintKind;
    use ndarray::array;

    fn set() -> ConstraintSet {
        ConstraintSet::new(1.0, array![1.0, -1.0, 1.0].view()).unwrap()
    }

    #[test]
    fn test_residuals() {
        let constraints = set();
        let a = [0.25, 0.5, 0.25];
        assert_eq!(constraints.non_negativity(&a), vec![0.25, 0.5, 0.25]);
        assert_eq!(constraints.upper_bound(&a), vec![0.75, 0.5, 0.75]);
        assert_eq!(constraints.equality(&a), 0.0);
        assert!(constraints.is_feasible(&a, 1e-12));
    }

    #[test]
    fn test_violations() {
        let constraints = set();
        assert_eq!(constraints.max_violation(&[-0.5, 0.0, 0.0]), 0.5);
        assert_eq!(constraints.max_violation(&[1.0, 1.0, 1.75]), 1.75);
        assert_eq!(constraints.max_violation(&[0.5, 0.0, 0.0]), 0.5);
        assert!(!constraints.is_feasible(&[0.0, 0.0], 1e-3));
    }

    #[test]
    fn test_solver_form() {
        let constraints = set();
        let solver_form = constraints.constraints();
        assert_eq!(solver_form.len(), 3);
        assert_eq!(solver_form[0].kind(), ConstraintKind::Inequality);
        assert_eq!(solver_form[1].kind(), ConstraintKind::Inequality);
        assert_eq!(solver_form[2].kind(), ConstraintKind::Equality);

        let a = [0.2, 0.9, 0.1];
        assert_eq!(solver_form[1].residual(&a), constraints.upper_bound(&a));
        assert_eq!(solver_form[2].residual(&a), vec![constraints.equality(&a)]);
        assert_eq!(
            solver_form[2].jacobian_transpose_product(&a, &[2.0]),
            vec![2.0, -2.0, 2.0]
        );
        assert_eq!(
            solver_form[1].jacobian_transpose_product(&a, &[1.0, 2.0, 3.0]),
            vec![-1.0, -2.0, -3.0]
        );
    }

    #[test]
    fn test_bounds_match_box_constraints() {
        let bounds = ConstraintSet::new(2.5, array![1.0, -1.0].view())
            .unwrap()
            .bounds()
            .unwrap();
        assert_eq!(bounds.lower(), &[0.0, 0.0]);
        assert_eq!(bounds.upper(), &[2.5, 2.5]);
    }

    #[test]
    fn test_rejects_invalid_input() {
        assert!(matches!(
            ConstraintSet::new(0.0, array![1.0].view()),
            Err(SVMError::InvalidParameter(_))
        ));
        assert!(matches!(
            ConstraintSet::new(-1.0, array![1.0].view()),
            Err(SVMError::InvalidParameter(_))
        ));
        assert!(matches!(
            ConstraintSet::new(1.0, array![1.0, 0.5].view()),
            Err(SVMError::InvalidLabel(_))
        ));
    }
}
