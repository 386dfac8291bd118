//! Descriptive statistics over the carbon dataset.

pub mod aggregator;
pub mod stats;

pub use aggregator::*;
