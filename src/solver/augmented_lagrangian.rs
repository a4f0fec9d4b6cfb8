//! Augmented Lagrangian method (Powell-Hestenes-Rockafellar form)
//!
//! For equality residuals `h(x) = 0` and inequality residuals `g(x) >= 0` the
//! subproblem minimised at multipliers `(λ, μ)` and penalty `ρ` is
//!
//! ```text
//! L(x) = f(x) + Σ λ_j h_j + ρ/2 Σ h_j² + 1/(2ρ) Σ (max(0, μ_i - ρ g_i)² - μ_i²)
//! ```
//!
//! A box `lower <= x <= upper` enters as two more inequality blocks,
//! `x - lower >= 0` and `upper - x >= 0`, so every subproblem is unconstrained
//! and continuously differentiable. Subproblems are handed to argmin's L-BFGS
//! with a More-Thuente line search. After each subproblem the multipliers are
//! updated, and `ρ` grows whenever the violation fails to shrink fast enough.

use crate::core::{Result, SolverConfig, SVMError};
use crate::solver::{Bounds, ConstrainedMinimizer, ConstraintKind, Problem, Solution};
use argmin::core::{CostFunction, Error as ArgminError, Executor, Gradient, State};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use log::{debug, warn};
use ndarray::Array1;

/// Required reduction of the violation per outer iteration before `ρ` grows
const VIOLATION_DECAY: f64 = 0.25;
const RHO_GROWTH: f64 = 10.0;

/// Number of correction pairs kept by L-BFGS
pub const DEFAULT_LBFGS_MEMORY: usize = 7;

type Param = Array1<f64>;
type MoreThuente = MoreThuenteLineSearch<Param, Param, f64>;
type LbfgsMoreThuente = LBFGS<MoreThuente, Param, Param, f64>;

/// Augmented Lagrangian minimizer
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentedLagrangian {
    /// Feasibility and stationarity tolerance
    pub tolerance: f64,
    /// L-BFGS iteration budget of each subproblem
    pub inner_max_iterations: usize,
    /// L-BFGS history length
    pub memory: usize,
    pub rho_init: f64,
    pub rho_max: f64,
}

impl Default for AugmentedLagrangian {
    fn default() -> Self {
        Self::from_config(&SolverConfig::default())
    }
}

impl AugmentedLagrangian {
    pub fn from_config(config: &SolverConfig) -> Self {
        Self {
            tolerance: config.tolerance,
            inner_max_iterations: config.inner_max_iterations,
            memory: DEFAULT_LBFGS_MEMORY,
            rho_init: config.rho_init,
            rho_max: config.rho_max,
        }
    }

    fn check(&self) -> Result<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "tolerance must be strictly positive, got: {}",
                self.tolerance
            )));
        }
        if !(self.rho_init > 0.0 && self.rho_max >= self.rho_init) {
            return Err(SVMError::InvalidParameter(format!(
                "penalty weights must satisfy 0 < rho_init <= rho_max, got {} and {}",
                self.rho_init, self.rho_max
            )));
        }
        if self.inner_max_iterations == 0 || self.memory == 0 {
            return Err(SVMError::InvalidParameter(
                "inner iteration budget and L-BFGS memory must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Run L-BFGS on one subproblem from `x0`, returning its best point and step count
    fn solve_subproblem(
        &self,
        subproblem: Subproblem<'_, '_>,
        x0: &[f64],
    ) -> std::result::Result<(Vec<f64>, u64), ArgminError> {
        let solver: LbfgsMoreThuente = LBFGS::new(MoreThuenteLineSearch::new(), self.memory)
            .with_tolerance_grad(self.tolerance)?
            .with_tolerance_cost(0.0)?;
        let max_iters = self.inner_max_iterations as u64;

        let result = Executor::new(subproblem, solver)
            .configure(|state| state.param(Array1::from(x0.to_vec())).max_iters(max_iters))
            .run()?;
        let state = result.state();
        let x = state
            .get_best_param()
            .map(|p| p.to_vec())
            .unwrap_or_else(|| x0.to_vec());
        Ok((x, state.get_iter()))
    }
}

/// Multiplier estimates: one vector per constraint, plus one per box side
struct Multipliers {
    constraints: Vec<Vec<f64>>,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Multipliers {
    fn zeros(problem: &Problem<'_>, x: &[f64]) -> Self {
        let n_box = problem.bounds().map_or(0, Bounds::len);
        Self {
            constraints: problem
                .constraints()
                .iter()
                .map(|c| vec![0.0; c.residual(x).len()])
                .collect(),
            lower: vec![0.0; n_box],
            upper: vec![0.0; n_box],
        }
    }

    fn update(&mut self, problem: &Problem<'_>, x: &[f64], rho: f64) {
        for (constraint, multipliers) in problem.constraints().iter().zip(&mut self.constraints) {
            let residual = constraint.residual(x);
            for (m, r) in multipliers.iter_mut().zip(residual) {
                *m = match constraint.kind() {
                    ConstraintKind::Equality => *m + rho * r,
                    ConstraintKind::Inequality => (*m - rho * r).max(0.0),
                };
            }
        }
        if let Some(bounds) = problem.bounds() {
            for (i, &xi) in x.iter().enumerate() {
                self.lower[i] = (self.lower[i] - rho * (xi - bounds.lower()[i])).max(0.0);
                self.upper[i] = (self.upper[i] - rho * (bounds.upper()[i] - xi)).max(0.0);
            }
        }
    }
}

/// PHR term of one inequality residual `g >= 0`
fn inequality_penalty(m: f64, g: f64, rho: f64) -> f64 {
    let shifted = (m - rho * g).max(0.0);
    (shifted * shifted - m * m) / (2.0 * rho)
}

/// Derivative of [`inequality_penalty`] with respect to `g`
fn inequality_weight(m: f64, g: f64, rho: f64) -> f64 {
    -(m - rho * g).max(0.0)
}

/// The augmented Lagrangian at fixed multipliers and penalty
struct Subproblem<'p, 'a> {
    problem: &'p Problem<'a>,
    multipliers: &'p Multipliers,
    rho: f64,
}

impl Subproblem<'_, '_> {
    fn lagrangian_value(&self, x: &[f64]) -> f64 {
        let rho = self.rho;
        let mut value = self.problem.value(x);
        for (constraint, mult) in self
            .problem
            .constraints()
            .iter()
            .zip(&self.multipliers.constraints)
        {
            let residual = constraint.residual(x);
            for (&m, r) in mult.iter().zip(residual) {
                value += match constraint.kind() {
                    ConstraintKind::Equality => m * r + 0.5 * rho * r * r,
                    ConstraintKind::Inequality => inequality_penalty(m, r, rho),
                };
            }
        }
        if let Some(bounds) = self.problem.bounds() {
            for (i, &xi) in x.iter().enumerate() {
                value += inequality_penalty(self.multipliers.lower[i], xi - bounds.lower()[i], rho);
                value += inequality_penalty(self.multipliers.upper[i], bounds.upper()[i] - xi, rho);
            }
        }
        value
    }

    fn lagrangian_gradient(&self, x: &[f64]) -> Vec<f64> {
        let rho = self.rho;
        let mut gradient = self.problem.gradient(x);
        for (constraint, mult) in self
            .problem
            .constraints()
            .iter()
            .zip(&self.multipliers.constraints)
        {
            let residual = constraint.residual(x);
            let weights: Vec<f64> = mult
                .iter()
                .zip(residual)
                .map(|(&m, r)| match constraint.kind() {
                    ConstraintKind::Equality => m + rho * r,
                    ConstraintKind::Inequality => inequality_weight(m, r, rho),
                })
                .collect();
            if weights.iter().all(|w| *w == 0.0) {
                continue;
            }
            let contribution = constraint.jacobian_transpose_product(x, &weights);
            for (g, c) in gradient.iter_mut().zip(contribution) {
                *g += c;
            }
        }
        if let Some(bounds) = self.problem.bounds() {
            for (i, g) in gradient.iter_mut().enumerate() {
                let xi = x[i];
                *g += inequality_weight(self.multipliers.lower[i], xi - bounds.lower()[i], rho);
                *g -= inequality_weight(self.multipliers.upper[i], bounds.upper()[i] - xi, rho);
            }
        }
        gradient
    }
}

fn with_slice<R>(p: &Param, f: impl FnOnce(&[f64]) -> R) -> R {
    match p.as_slice() {
        Some(x) => f(x),
        None => f(&p.to_vec()),
    }
}

impl CostFunction for Subproblem<'_, '_> {
    type Param = Param;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> std::result::Result<Self::Output, ArgminError> {
        Ok(with_slice(p, |x| self.lagrangian_value(x)))
    }
}

impl Gradient for Subproblem<'_, '_> {
    type Param = Param;
    type Gradient = Param;

    fn gradient(&self, p: &Self::Param) -> std::result::Result<Self::Gradient, ArgminError> {
        Ok(Array1::from(with_slice(p, |x| self.lagrangian_gradient(x))))
    }
}

/// Largest absolute entry; NaN if any entry is NaN
fn inf_norm(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |acc: f64, g| {
        if acc.is_nan() || g.is_nan() {
            f64::NAN
        } else {
            acc.max(g.abs())
        }
    })
}

/// Final point, moved into the box when there is one
fn solution(
    problem: &Problem<'_>,
    mut x: Vec<f64>,
    iterations: usize,
    converged: bool,
    message: String,
) -> Solution {
    if let Some(bounds) = problem.bounds() {
        bounds.project(&mut x);
    }
    Solution {
        objective: problem.value(&x),
        max_violation: problem.max_violation(&x),
        x,
        iterations,
        converged,
        message,
    }
}

impl ConstrainedMinimizer for AugmentedLagrangian {
    fn minimize(
        &self,
        problem: &Problem<'_>,
        x0: &[f64],
        max_iterations: usize,
    ) -> Result<Solution> {
        if max_iterations == 0 {
            return Err(SVMError::InvalidParameter(
                "max_iterations must be positive".to_string(),
            ));
        }
        if let Some(bounds) = problem.bounds() {
            if bounds.len() != x0.len() {
                return Err(SVMError::shape("initial guess", bounds.len(), x0.len()));
            }
        }
        self.check()?;

        let mut multipliers = Multipliers::zeros(problem, x0);
        let mut rho = self.rho_init;
        let mut x = x0.to_vec();
        let mut previous_violation = f64::INFINITY;
        let mut violation = f64::INFINITY;
        let mut stationarity = f64::INFINITY;

        for iteration in 1..=max_iterations {
            let subproblem = Subproblem {
                problem,
                multipliers: &multipliers,
                rho,
            };
            let inner_steps = match self.solve_subproblem(subproblem, &x) {
                Ok((next, steps)) => {
                    x = next;
                    steps
                }
                Err(e) => {
                    debug!("subproblem solve stopped early: {e}");
                    0
                }
            };

            let subproblem = Subproblem {
                problem,
                multipliers: &multipliers,
                rho,
            };
            stationarity = inf_norm(&subproblem.lagrangian_gradient(&x));
            violation = problem.max_violation(&x);

            debug!(
                "augmented lagrangian iteration {}: violation={:.3e} stationarity={:.3e} rho={:.1e} inner_steps={}",
                iteration, violation, stationarity, rho, inner_steps
            );

            if !violation.is_finite() || !stationarity.is_finite() {
                break;
            }
            if violation <= self.tolerance && stationarity <= self.tolerance {
                return Ok(solution(problem, x, iteration, true, "converged".to_string()));
            }

            multipliers.update(problem, &x, rho);
            if violation > VIOLATION_DECAY * previous_violation {
                rho = (rho * RHO_GROWTH).min(self.rho_max);
            }
            previous_violation = violation;
        }

        let message = if !violation.is_finite() || !stationarity.is_finite() {
            "constraint residuals or gradients became non-finite".to_string()
        } else if violation > self.tolerance {
            format!(
                "constraints still violated by {violation:.3e} (tolerance {:.1e})",
                self.tolerance
            )
        } else {
            format!("iteration budget exhausted at stationarity {stationarity:.3e}")
        };
        warn!("augmented lagrangian stopped without converging: {message}");

        Ok(solution(problem, x, max_iterations, false, message))
    }
}
