//! Dispersion estimation for negative binomial models
//!
//! Three passes: gene-wise Cox-Reid estimates, a mean-dispersion trend, and
//! MAP shrinkage of the gene-wise values toward the trend.

mod gene_wise;
mod map;
mod trend;

pub use gene_wise::{estimate_dispersion_gene, estimate_gene_dispersions, GeneWiseDispersions};
pub use map::{estimate_map_dispersions, estimate_prior_variance, fit_map_dispersion, MapDispersions};
pub use trend::{fit_dispersion_trend, DispersionTrend};

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use statrs::function::gamma::ln_gamma;

use crate::error::{ReportError, Result};
use crate::glm::linalg::{log_det_spd, weighted_gram};
use crate::glm::{intercept_design, residual_df};
use crate::normalization::{base_mean_and_var, normalized_counts};

/// Configurable parameters for dispersion estimation
#[derive(Debug, Clone)]
pub struct DispersionParams {
    /// Lower bound on any dispersion
    pub min_disp: f64,
    /// Golden-section stopping width on the log scale
    pub disp_tol: f64,
    /// Points per grid pass
    pub grid_size: usize,
    /// Gene-wise estimates this many prior SDs above the trend are kept unshrunk
    pub outlier_sd: f64,
}

impl Default for DispersionParams {
    fn default() -> Self {
        Self {
            min_disp: 1e-8,
            disp_tol: 1e-6,
            grid_size: 20,
            outlier_sd: 2.0,
        }
    }
}

/// Upper bound on dispersion for `n` samples
pub fn max_dispersion(n_samples: usize) -> f64 {
    (n_samples as f64).max(10.0)
}

/// All dispersion estimates for one dataset
#[derive(Debug, Clone)]
pub struct DispersionEstimates {
    pub gene_wise: Array1<f64>,
    pub trend: DispersionTrend,
    pub trended: Array1<f64>,
    /// Final values used for testing
    pub map: Array1<f64>,
    pub prior_var: f64,
    pub outliers: Vec<bool>,
    /// True when the intercept-only design replaced the requested one
    pub blind: bool,
}

/// Estimate gene-wise, trended and MAP dispersions.
///
/// Without residual degrees of freedom (one sample per group) the
/// estimates fall back to the intercept-only design.
pub fn estimate_dispersions(
    counts: ArrayView2<'_, f64>,
    size_factors: ArrayView1<'_, f64>,
    design: &Array2<f64>,
    params: &DispersionParams,
) -> Result<DispersionEstimates> {
    let n_samples = counts.ncols();
    let mut blind = false;
    let intercept;
    let design = if residual_df(design) <= 0 {
        intercept = intercept_design(n_samples);
        if residual_df(&intercept) <= 0 {
            return Err(ReportError::InvalidDesign {
                reason: "a single sample leaves no degrees of freedom for dispersion".to_string(),
            });
        }
        log::warn!(
            "No replicates: {} samples for {} coefficients; estimating dispersions blind to the design",
            n_samples,
            design.ncols()
        );
        blind = true;
        &intercept
    } else {
        design
    };

    let gene = estimate_gene_dispersions(counts, size_factors, design, params);

    let normalized = normalized_counts(counts, size_factors)?;
    let (base_means, _) = base_mean_and_var(normalized.view());
    let trend = fit_dispersion_trend(
        base_means.as_slice().unwrap_or(&[]),
        gene.dispersions.as_slice().unwrap_or(&[]),
        params.min_disp,
    )?;
    let trended: Array1<f64> = base_means.mapv(|m| trend.eval(m));

    let map = estimate_map_dispersions(counts, design, gene.mu.view(), &gene.dispersions, &trended, params);

    log::info!(
        "Dispersions: trend {}, prior variance {:.4}, {} outliers",
        trend,
        map.prior_var,
        map.outliers.iter().filter(|&&o| o).count()
    );

    Ok(DispersionEstimates {
        gene_wise: gene.dispersions,
        trend,
        trended,
        map: map.dispersions,
        prior_var: map.prior_var,
        outliers: map.outliers,
        blind,
    })
}

/// Cox-Reid adjusted NB log-likelihood in log(alpha), with mu held fixed.
/// Terms that do not depend on alpha are dropped.
pub(crate) fn cox_reid_log_likelihood(
    counts: &[f64],
    design: &Array2<f64>,
    mu: &[f64],
    log_alpha: f64,
) -> f64 {
    let alpha = log_alpha.exp();
    let alpha_inv = 1.0 / alpha;

    let mut ll = 0.0;
    let mut weights = Vec::with_capacity(counts.len());
    for (&y, &m) in counts.iter().zip(mu) {
        let m = m.max(1e-10);
        ll += ln_gamma(y + alpha_inv) - ln_gamma(alpha_inv);
        ll -= y * (m + alpha_inv).ln();
        ll -= alpha_inv * (1.0 + m * alpha).ln();
        weights.push(1.0 / (1.0 / m + alpha));
    }

    let cr = log_det_spd(weighted_gram(design.view(), &weights).view())
        .map(|d| -0.5 * d)
        .unwrap_or(0.0);
    ll + cr
}

/// Maximize `f` over [lo, hi] (log scale): coarse grid, fine grid around the
/// best coarse point, then golden-section refinement.
pub(crate) fn maximize_log_alpha<F: Fn(f64) -> f64>(
    f: F,
    lo: f64,
    hi: f64,
    params: &DispersionParams,
) -> f64 {
    let n = params.grid_size.max(3);
    let best_on = |from: f64, to: f64| -> (f64, f64) {
        let step = (to - from) / (n - 1) as f64;
        let mut best = (from, f64::NEG_INFINITY);
        for i in 0..n {
            let x = from + i as f64 * step;
            let value = f(x);
            if value > best.1 {
                best = (x, value);
            }
        }
        (best.0, step)
    };

    let (coarse, delta) = best_on(lo, hi);
    let (fine, fine_delta) = best_on((coarse - delta).max(lo), (coarse + delta).min(hi));

    // Golden-section search on [a, b]
    let inv_phi = (5.0_f64.sqrt() - 1.0) / 2.0;
    let mut a = (fine - fine_delta).max(lo);
    let mut b = (fine + fine_delta).min(hi);
    let mut c = b - inv_phi * (b - a);
    let mut d = a + inv_phi * (b - a);
    let (mut fc, mut fd) = (f(c), f(d));
    while (b - a).abs() > params.disp_tol {
        if fc > fd {
            b = d;
            d = c;
            fd = fc;
            c = b - inv_phi * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + inv_phi * (b - a);
            fd = f(d);
        }
    }
    let refined = (a + b) / 2.0;
    if f(refined) >= f(fine) {
        refined
    } else {
        fine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_maximize_quadratic() {
        let params = DispersionParams::default();
        let x = maximize_log_alpha(|x| -(x + 2.3).powi(2), -18.0, 2.3, &params);
        assert!((x + 2.3).abs() < 1e-5);
    }

    #[test]
    fn test_maximize_boundary() {
        let params = DispersionParams::default();
        let x = maximize_log_alpha(|x| -x, -5.0, 1.0, &params);
        assert!((x + 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_estimate_dispersions_blind_fallback() {
        let counts = array![
            [10.0, 100.0],
            [20.0, 25.0],
            [30.0, 28.0],
            [50.0, 40.0],
        ];
        let sf = Array1::ones(2);
        let design = array![[1.0, 0.0], [1.0, 1.0]];
        let est = estimate_dispersions(counts.view(), sf.view(), &design, &DispersionParams::default())
            .unwrap();
        assert!(est.blind);
        assert!(est.map.iter().all(|d| d.is_finite() && *d > 0.0));
    }

    #[test]
    fn test_single_sample_rejected() {
        let counts = array![[10.0], [20.0]];
        let sf = Array1::ones(1);
        let design = intercept_design(1);
        assert!(estimate_dispersions(counts.view(), sf.view(), &design, &DispersionParams::default()).is_err());
    }
}
