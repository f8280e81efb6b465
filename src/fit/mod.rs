//! Model fitting and comparison.
//!
//! Responsibilities:
//!
//! - fit each logistic specification by IRLS (`fitter`)
//! - estimate out-of-sample log-loss by K-fold CV (`crossval`, parallel folds)
//! - score and rank models by AIC / pseudo-R² / CV (`compare`)

pub mod compare;
pub mod crossval;
pub mod fitter;

pub use compare::*;
pub use crossval::*;
pub use fitter::*;
