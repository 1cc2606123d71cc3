//! Utility functions and helpers

pub mod random;

pub use random::{sample_normal, sample_standard_normal, sample_unit_open};
