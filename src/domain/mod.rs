//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - closed categorical level sets (`Race`, `Gender`, `Area`, `Violent`)
//! - observations and the immutable `Dataset`
//! - fit and comparison outputs (`FittedModel`, `ComparisonRecord`, etc.)
//! - run configuration (`RunConfig`, `GenerateConfig`)

pub mod types;

pub use types::*;
