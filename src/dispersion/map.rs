//! Maximum a posteriori dispersion shrinkage toward the trend

use ndarray::{Array1, Array2, ArrayView2};
use rayon::prelude::*;

use super::{cox_reid_log_likelihood, max_dispersion, maximize_log_alpha, DispersionParams};
use crate::stats::{mad_squared, trigamma};

const MIN_PRIOR_VAR: f64 = 0.25;

/// Shrunken dispersions with the prior they were shrunk under
#[derive(Debug, Clone)]
pub struct MapDispersions {
    pub dispersions: Array1<f64>,
    pub prior_var: f64,
    /// Genes whose gene-wise estimate sits far above the trend and was kept
    pub outliers: Vec<bool>,
}

/// Prior variance of log dispersions around the trend.
///
/// Returns (prior variance, observed variance of log residuals). The observed
/// variance is the squared MAD of log(gene) - log(trend) over genes above
/// 100 * `min_disp`; the expected sampling variance trigamma((n - p) / 2) is
/// subtracted and the result floored at 0.25.
pub fn estimate_prior_variance(
    gene_dispersions: &[f64],
    trended: &[f64],
    n_samples: usize,
    n_coef: usize,
    min_disp: f64,
) -> (f64, f64) {
    let residuals: Vec<f64> = gene_dispersions
        .iter()
        .zip(trended)
        .filter(|(&g, &t)| g.is_finite() && g >= 100.0 * min_disp && t.is_finite() && t > 0.0)
        .map(|(&g, &t)| g.ln() - t.ln())
        .collect();

    if residuals.len() < 3 {
        return (MIN_PRIOR_VAR, MIN_PRIOR_VAR);
    }

    let observed = mad_squared(&residuals);
    if n_samples <= n_coef {
        return (MIN_PRIOR_VAR, observed);
    }

    let expected = trigamma((n_samples - n_coef) as f64 / 2.0);
    ((observed - expected).max(MIN_PRIOR_VAR), observed)
}

/// MAP dispersion for one gene: Cox-Reid likelihood plus a normal prior on
/// log(alpha) centred at log(trend)
pub fn fit_map_dispersion(
    counts: &[f64],
    design: &Array2<f64>,
    mu: &[f64],
    trend_disp: f64,
    prior_var: f64,
    params: &DispersionParams,
) -> f64 {
    let prior_mean = trend_disp.ln();
    let posterior = |log_alpha: f64| {
        cox_reid_log_likelihood(counts, design, mu, log_alpha)
            - 0.5 * (log_alpha - prior_mean).powi(2) / prior_var
    };
    let max_disp = max_dispersion(counts.len());
    maximize_log_alpha(posterior, params.min_disp.ln(), max_disp.ln(), params)
        .exp()
        .clamp(params.min_disp, max_disp)
}

/// Shrink every gene toward the trend.
///
/// Genes with an undefined gene-wise estimate stay undefined; outliers keep
/// their gene-wise value.
pub fn estimate_map_dispersions(
    counts: ArrayView2<'_, f64>,
    design: &Array2<f64>,
    mu: ArrayView2<'_, f64>,
    gene_dispersions: &Array1<f64>,
    trended: &Array1<f64>,
    params: &DispersionParams,
) -> MapDispersions {
    let gene = gene_dispersions.to_vec();
    let trend = trended.to_vec();
    let (prior_var, observed_var) =
        estimate_prior_variance(&gene, &trend, counts.ncols(), design.ncols(), params.min_disp);
    let threshold = params.outlier_sd * observed_var.sqrt();

    let results: Vec<(f64, bool)> = (0..counts.nrows())
        .into_par_iter()
        .map(|i| {
            let (g, t) = (gene[i], trend[i]);
            if !g.is_finite() {
                return (f64::NAN, false);
            }
            if g.ln() - t.ln() > threshold {
                return (g, true);
            }
            let row = counts.row(i).to_vec();
            let gene_mu = mu.row(i).to_vec();
            (fit_map_dispersion(&row, design, &gene_mu, t, prior_var, params), false)
        })
        .collect();

    let (dispersions, outliers): (Vec<f64>, Vec<bool>) = results.into_iter().unzip();
    log::debug!(
        "MAP shrinkage: prior variance {:.4}, log-residual variance {:.4}",
        prior_var,
        observed_var
    );
    MapDispersions {
        dispersions: Array1::from_vec(dispersions),
        prior_var,
        outliers,
    }
}
