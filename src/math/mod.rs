//! Mathematical utilities: spline basis, weighted least squares, logistic helpers.

pub mod basis;
pub mod logistic;
pub mod ols;

pub use basis::*;
pub use logistic::*;
pub use ols::*;
