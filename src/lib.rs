//! `force-logit` library crate.
//!
//! The binary (`force-logit`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the fitting and comparison stages can be driven from integration tests
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod effects;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
