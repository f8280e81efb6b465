//! Dataset providers that do not read an existing file.

pub mod sample;

pub use sample::*;
