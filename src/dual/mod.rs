//! The SVM dual problem: objective and feasible region

pub mod constraints;
pub mod objective;

pub use self::constraints::*;
pub use self::objective::*;
