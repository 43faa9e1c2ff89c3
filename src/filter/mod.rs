//! Independent filtering of test results

mod independent;

pub use independent::{independent_filtering, FilterOutcome};
