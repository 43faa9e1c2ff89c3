//! Normalization methods for RNA-seq count data

mod counts;
mod size_factors;

pub use counts::{base_mean_and_var, normalized_counts};
pub use size_factors::{estimate_size_factors, size_factors_with, SizeFactorMethod};
