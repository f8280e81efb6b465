//! Reporting utilities: console summaries of a comparison run.

pub mod format;

pub use format::*;
