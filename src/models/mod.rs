//! Logistic model specifications.
//!
//! Each specification is a design-matrix recipe; fitting code stays generic
//! over `ModelKind`.

pub mod model;

pub use model::*;
