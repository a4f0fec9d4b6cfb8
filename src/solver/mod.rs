//! General constrained minimization
//!
//! Training only needs "minimize a scalar objective subject to inequality and
//! equality constraints within an iteration budget". That contract is the
//! [`ConstrainedMinimizer`] trait; [`AugmentedLagrangian`] is the minimizer
//! shipped with the crate, and any other implementation can replace it.

pub mod augmented_lagrangian;

pub use self::augmented_lagrangian::*;

use crate::core::{Result, SVMError};
use finitediff::FiniteDiff;

pub type ObjectiveFn<'a> = Box<dyn Fn(&[f64]) -> f64 + 'a>;
pub type GradientFn<'a> = Box<dyn Fn(&[f64]) -> Vec<f64> + 'a>;
pub type ResidualFn<'a> = Box<dyn Fn(&[f64]) -> Vec<f64> + 'a>;
/// `(x, v) -> J(x)^T v` for the Jacobian `J` of a residual function
pub type JacobianTransposeFn<'a> = Box<dyn Fn(&[f64], &[f64]) -> Vec<f64> + 'a>;

/// How a constraint residual must behave at a feasible point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Every residual component must be non-negative
    Inequality,
    /// Every residual component must be zero
    Equality,
}

/// A vector-valued constraint on the decision variables
pub struct Constraint<'a> {
    name: &'static str,
    kind: ConstraintKind,
    residual: ResidualFn<'a>,
    jacobian_t: Option<JacobianTransposeFn<'a>>,
}

impl<'a> Constraint<'a> {
    /// Constraint `residual(x) >= 0`
    pub fn inequality<F>(name: &'static str, residual: F) -> Self
    where
        F: Fn(&[f64]) -> Vec<f64> + 'a,
    {
        Self {
            name,
            kind: ConstraintKind::Inequality,
            residual: Box::new(residual),
            jacobian_t: None,
        }
    }

    /// Constraint `residual(x) == 0`
    pub fn equality<F>(name: &'static str, residual: F) -> Self
    where
        F: Fn(&[f64]) -> Vec<f64> + 'a,
    {
        Self {
            name,
            kind: ConstraintKind::Equality,
            residual: Box::new(residual),
            jacobian_t: None,
        }
    }

    /// Attach an analytic Jacobian-transpose product. Without one, the product
    /// is estimated with central differences.
    pub fn with_jacobian_transpose<J>(mut self, jacobian_t: J) -> Self
    where
        J: Fn(&[f64], &[f64]) -> Vec<f64> + 'a,
    {
        self.jacobian_t = Some(Box::new(jacobian_t));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    /// Evaluate the residual vector
    pub fn residual(&self, x: &[f64]) -> Vec<f64> {
        (self.residual)(x)
    }

    /// Largest amount by which `x` breaks this constraint (0 when satisfied)
    pub fn violation(&self, x: &[f64]) -> f64 {
        let residual = self.residual(x);
        match self.kind {
            ConstraintKind::Inequality => residual.iter().fold(0.0, |acc, &r| acc.max(-r)),
            ConstraintKind::Equality => residual.iter().fold(0.0, |acc, &r| acc.max(r.abs())),
        }
    }

    /// `J(x)^T v`
    pub fn jacobian_transpose_product(&self, x: &[f64], v: &[f64]) -> Vec<f64> {
        match &self.jacobian_t {
            Some(jacobian_t) => jacobian_t(x, v),
            None => {
                let weighted = |p: &Vec<f64>| -> f64 {
                    (self.residual)(p)
                        .iter()
                        .zip(v.iter())
                        .map(|(r, w)| r * w)
                        .sum()
                };
                x.to_vec().central_diff(&weighted)
            }
        }
    }
}

impl std::fmt::Debug for Constraint<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constraint")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("analytic_jacobian", &self.jacobian_t.is_some())
            .finish()
    }
}

/// Simple per-variable box `lower <= x <= upper`
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Bounds {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self> {
        if lower.len() != upper.len() {
            return Err(SVMError::shape("bounds", lower.len(), upper.len()));
        }
        if let Some((lo, hi)) = lower.iter().zip(upper.iter()).find(|(lo, hi)| !(lo <= hi)) {
            return Err(SVMError::InvalidParameter(format!(
                "lower bound {lo} exceeds upper bound {hi}"
            )));
        }
        Ok(Self { lower, upper })
    }

    /// The same interval for all `n` variables
    pub fn uniform(n: usize, lower: f64, upper: f64) -> Result<Self> {
        Self::new(vec![lower; n], vec![upper; n])
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Clamp `x` into the box in place
    pub fn project(&self, x: &mut [f64]) {
        for ((xi, lo), hi) in x.iter_mut().zip(&self.lower).zip(&self.upper) {
            *xi = xi.clamp(*lo, *hi);
        }
    }

    /// Largest distance from `x` to the box
    pub fn violation(&self, x: &[f64]) -> f64 {
        x.iter()
            .zip(&self.lower)
            .zip(&self.upper)
            .fold(0.0, |acc, ((xi, lo), hi)| {
                acc.max(lo - xi).max(xi - hi)
            })
    }
}

/// Minimization problem handed to a [`ConstrainedMinimizer`]
pub struct Problem<'a> {
    objective: ObjectiveFn<'a>,
    gradient: Option<GradientFn<'a>>,
    constraints: Vec<Constraint<'a>>,
    bounds: Option<Bounds>,
}

impl<'a> Problem<'a> {
    /// Unconstrained problem; the gradient is estimated numerically until
    /// [`Problem::with_gradient`] supplies one
    pub fn new<F>(objective: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + 'a,
    {
        Self {
            objective: Box::new(objective),
            gradient: None,
            constraints: Vec::new(),
            bounds: None,
        }
    }

    pub fn with_gradient<G>(mut self, gradient: G) -> Self
    where
        G: Fn(&[f64]) -> Vec<f64> + 'a,
    {
        self.gradient = Some(Box::new(gradient));
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint<'a>) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_constraints<I>(mut self, constraints: I) -> Self
    where
        I: IntoIterator<Item = Constraint<'a>>,
    {
        self.constraints.extend(constraints);
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn constraints(&self) -> &[Constraint<'a>] {
        &self.constraints
    }

    pub fn bounds(&self) -> Option<&Bounds> {
        self.bounds.as_ref()
    }

    pub fn value(&self, x: &[f64]) -> f64 {
        (self.objective)(x)
    }

    pub fn gradient(&self, x: &[f64]) -> Vec<f64> {
        match &self.gradient {
            Some(gradient) => gradient(x),
            None => x.to_vec().central_diff(&|p: &Vec<f64>| (self.objective)(p)),
        }
    }

    pub fn has_gradient(&self) -> bool {
        self.gradient.is_some()
    }

    /// Largest violation over all constraints and the bounds
    pub fn max_violation(&self, x: &[f64]) -> f64 {
        let bound_violation = self.bounds.as_ref().map_or(0.0, |b| b.violation(x));
        self.constraints
            .iter()
            .map(|c| c.violation(x))
            .fold(bound_violation, f64::max)
    }
}

/// Outcome of a minimization
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub x: Vec<f64>,
    pub objective: f64,
    pub iterations: usize,
    pub max_violation: f64,
    pub converged: bool,
    pub message: String,
}

/// A general nonlinear minimizer for inequality and equality constrained problems
pub trait ConstrainedMinimizer {
    /// Minimize `problem` from `x0` using at most `max_iterations` iterations.
    ///
    /// Running out of iterations is not an error: the best point found is
    /// returned with `converged == false`.
    fn minimize(&self, problem: &Problem<'_>, x0: &[f64], max_iterations: usize)
        -> Result<Solution>;
}
