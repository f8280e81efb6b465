//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - dataset and result exports (CSV/JSON) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
