//! Kernel functions for SVM

pub mod gaussian;
pub mod linear;
pub mod traits;

pub use self::gaussian::*;
pub use self::linear::*;
pub use self::traits::*;
