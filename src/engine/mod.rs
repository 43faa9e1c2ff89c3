//! Differential expression engines
//!
//! The report talks to an engine only through [`DifferentialExpressionEngine`];
//! [`NegativeBinomialEngine`] is the implementation shipped with the crate.

mod negative_binomial;
mod results;

pub use negative_binomial::NegativeBinomialEngine;
pub use results::{
    is_significant, Contrast, DeResultRow, DeResults, ResultsSummary, LFC_THRESHOLD, PADJ_THRESHOLD,
};

use crate::data::ExperimentDataset;
use crate::error::Result;

/// Per-gene two-condition comparison on one dataset
pub trait DifferentialExpressionEngine {
    /// Test `contrast.treated` against `contrast.control`. The dataset's
    /// design variable must be `contrast.variable` with exactly those two
    /// levels. Returns one row per gene, in count-matrix order.
    fn test(&self, dataset: &ExperimentDataset, contrast: &Contrast) -> Result<DeResults>;
}
