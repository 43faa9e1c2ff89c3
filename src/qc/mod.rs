//! Quality control on variance-stabilized data: per-sample distributions and
//! a two-dimensional PCA embedding

mod boxstats;
mod pca;

pub use boxstats::{box_stats, BoxStats};
pub use pca::{pca, PcaPoint, PcaResult, DEFAULT_N_TOP};

use serde::Serialize;

use crate::data::SampleMetadata;
use crate::error::{ReportError, Result};
use crate::transform::VstResult;

/// QC outputs consumed by the report
#[derive(Debug, Clone, Serialize)]
pub struct QcSummary {
    pub box_stats: Vec<BoxStats>,
    pub pca: PcaResult,
}

impl QcSummary {
    pub fn flagged_samples(&self) -> Vec<&str> {
        self.box_stats
            .iter()
            .filter(|s| s.flagged)
            .map(|s| s.sample_id.as_str())
            .collect()
    }
}

fn column<'a>(metadata: &'a SampleMetadata, name: &str) -> Result<&'a [String]> {
    metadata
        .condition(name)
        .map(|v| v.as_slice())
        .ok_or_else(|| ReportError::InvalidMetadata {
            reason: format!("column '{}' not found", name),
        })
}

/// Box statistics and PCA of the transformed matrix, labelled by cell line
/// and condition
pub fn run_qc(
    vst: &VstResult,
    metadata: &SampleMetadata,
    cell_line_column: &str,
    condition_column: &str,
    median_tolerance: f64,
) -> Result<QcSummary> {
    if metadata.sample_ids() != vst.sample_ids.as_slice() {
        return Err(ReportError::SampleMismatch {
            reason: "transformed matrix and metadata list different samples".to_string(),
        });
    }

    let box_stats = box_stats(vst.data.view(), &vst.sample_ids, median_tolerance);
    let pca = pca(
        vst.data.view(),
        &vst.sample_ids,
        column(metadata, cell_line_column)?,
        column(metadata, condition_column)?,
        DEFAULT_N_TOP,
    )?;
    log::info!(
        "QC: {} samples, {} flagged, PC1 {:.1}%, PC2 {:.1}%",
        box_stats.len(),
        box_stats.iter().filter(|s| s.flagged).count(),
        pca.percent_var[0],
        pca.percent_var[1]
    );
    Ok(QcSummary { box_stats, pca })
}
