//! Variance stabilizing transformation
//!
//! Dispersions are estimated blind to the design, a trend is fitted, and
//! counts are mapped through the closed-form transform of that trend.

use std::f64::consts::LN_2;

use ndarray::{Array1, Array2, Zip};

use crate::data::CountMatrix;
use crate::dispersion::{estimate_gene_dispersions, fit_dispersion_trend, DispersionParams, DispersionTrend};
use crate::error::{ReportError, Result};
use crate::glm::intercept_design;
use crate::normalization::{base_mean_and_var, estimate_size_factors, normalized_counts};

/// Variance-stabilized matrix with the quantities it was derived from
#[derive(Debug, Clone)]
pub struct VstResult {
    /// Transformed data (genes x samples), log2-like scale
    pub data: Array2<f64>,
    pub gene_ids: Vec<String>,
    pub sample_ids: Vec<String>,
    pub size_factors: Array1<f64>,
    pub trend: DispersionTrend,
}

/// Transform a single normalized count under the given trend
pub fn vst_value(q: f64, trend: &DispersionTrend) -> f64 {
    match *trend {
        DispersionTrend::Parametric {
            asympt_disp,
            extra_pois,
        } => {
            let a0 = asympt_disp;
            let a1 = extra_pois;
            ((1.0 + a1 + 2.0 * a0 * q + 2.0 * (a0 * q * (1.0 + a1 + a0 * q)).sqrt()) / (4.0 * a0)).log2()
        }
        DispersionTrend::Mean(alpha) => {
            (2.0 * (alpha * q).sqrt().asinh() - alpha.ln() - 4.0_f64.ln()) / LN_2
        }
    }
}

/// Blind variance stabilizing transformation of a count matrix
pub fn vst(counts: &CountMatrix, params: &DispersionParams) -> Result<VstResult> {
    if counts.n_samples() < 2 {
        return Err(ReportError::InvalidInput {
            reason: "variance stabilization needs at least two samples".to_string(),
        });
    }

    let size_factors = estimate_size_factors(counts.counts())?;
    let design = intercept_design(counts.n_samples());
    let gene = estimate_gene_dispersions(counts.counts(), size_factors.view(), &design, params);

    let normalized = normalized_counts(counts.counts(), size_factors.view())?;
    let (base_means, _) = base_mean_and_var(normalized.view());
    let trend = fit_dispersion_trend(
        &base_means.to_vec(),
        &gene.dispersions.to_vec(),
        params.min_disp,
    )?;
    log::info!("VST: blind dispersion trend {}", trend);

    let mut data = Array2::zeros(normalized.dim());
    Zip::from(&mut data)
        .and(&normalized)
        .for_each(|out, &q| *out = vst_value(q, &trend));

    Ok(VstResult {
        data,
        gene_ids: counts.gene_ids().to_vec(),
        sample_ids: counts.sample_ids().to_vec(),
        size_factors,
        trend,
    })
}
