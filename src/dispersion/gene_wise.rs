//! Gene-wise dispersion estimation using Cox-Reid adjusted profile likelihood

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;

use super::{cox_reid_log_likelihood, max_dispersion, maximize_log_alpha, DispersionParams};
use crate::glm::linalg::{solve_spd, weighted_gram};
use crate::glm::MIN_MU;
use crate::stats::mean_and_variance;

/// Gene-wise estimates and the fitted means they were computed at
#[derive(Debug, Clone)]
pub struct GeneWiseDispersions {
    /// NaN for all-zero genes
    pub dispersions: Array1<f64>,
    /// Fitted means (genes x samples), reused by MAP shrinkage
    pub mu: Array2<f64>,
}

/// Least-squares fit of normalized counts on the design, mapped back to the
/// count scale. For group designs this is the per-group mean.
fn linear_model_mu(normalized: &[f64], design: &Array2<f64>) -> Vec<f64> {
    let y = Array1::from_vec(normalized.to_vec());
    let gram = weighted_gram(design.view(), &vec![1.0; normalized.len()]);
    match solve_spd(gram.view(), design.t().dot(&y).view()) {
        Some(beta) => design.dot(&beta).to_vec(),
        None => {
            let (mean, _) = mean_and_variance(normalized);
            vec![mean; normalized.len()]
        }
    }
}

/// sum(((y - mu)^2 - mu) / mu^2) / (n - p) on normalized counts, mu floored at 1
fn rough_disp_estimate(normalized: &[f64], design: &Array2<f64>) -> f64 {
    let df = normalized.len() as f64 - design.ncols() as f64;
    if df <= 0.0 {
        return f64::INFINITY;
    }
    let mu = linear_model_mu(normalized, design);
    let sum: f64 = normalized
        .iter()
        .zip(&mu)
        .map(|(&y, &m)| {
            let m = m.max(1.0);
            ((y - m).powi(2) - m) / (m * m)
        })
        .sum();
    (sum / df).max(0.0)
}

/// (variance - xim * mean) / mean^2, where xim = mean(1 / size factors)
fn moments_disp_estimate(normalized: &[f64], xim: f64) -> f64 {
    let (mean, var) = mean_and_variance(normalized);
    if mean > 1e-10 {
        (var - xim * mean) / (mean * mean)
    } else {
        f64::INFINITY
    }
}

/// Estimate the dispersion of one gene.
///
/// Returns (dispersion, mu). The moment estimates seed the search and are
/// kept when the likelihood optimum does not improve on them.
pub fn estimate_dispersion_gene(
    counts: &[f64],
    size_factors: &[f64],
    design: &Array2<f64>,
    xim: f64,
    params: &DispersionParams,
) -> (f64, Vec<f64>) {
    let n = counts.len();
    if counts.iter().all(|&c| c == 0.0) {
        return (f64::NAN, vec![0.0; n]);
    }

    let min_disp = params.min_disp;
    let max_disp = max_dispersion(n);

    let normalized: Vec<f64> = counts.iter().zip(size_factors).map(|(&c, &s)| c / s).collect();

    let start = rough_disp_estimate(&normalized, design)
        .min(moments_disp_estimate(&normalized, xim))
        .clamp(min_disp, max_disp);

    let mu: Vec<f64> = linear_model_mu(&normalized, design)
        .iter()
        .zip(size_factors)
        .map(|(&m, &s)| (m * s).max(MIN_MU))
        .collect();

    let objective = |log_alpha: f64| cox_reid_log_likelihood(counts, design, &mu, log_alpha);
    let best = maximize_log_alpha(objective, min_disp.ln(), max_disp.ln(), params);

    let start_lp = objective(start.ln());
    let best_lp = objective(best);
    let dispersion = if best_lp < start_lp + start_lp.abs() / 1e6 {
        start
    } else {
        best.exp()
    };

    (dispersion.clamp(min_disp, max_disp), mu)
}

/// Estimate gene-wise dispersions for every gene in parallel
pub fn estimate_gene_dispersions(
    counts: ArrayView2<'_, f64>,
    size_factors: ArrayView1<'_, f64>,
    design: &Array2<f64>,
    params: &DispersionParams,
) -> GeneWiseDispersions {
    let (n_genes, n_samples) = counts.dim();
    let sf: Vec<f64> = size_factors.to_vec();
    let xim = sf.iter().map(|s| 1.0 / s).sum::<f64>() / n_samples as f64;

    let results: Vec<(f64, Vec<f64>)> = (0..n_genes)
        .into_par_iter()
        .map(|i| {
            let row: Vec<f64> = counts.row(i).to_vec();
            estimate_dispersion_gene(&row, &sf, design, xim, params)
        })
        .collect();

    let mut dispersions = Array1::zeros(n_genes);
    let mut mu = Array2::zeros((n_genes, n_samples));
    for (i, (disp, gene_mu)) in results.into_iter().enumerate() {
        dispersions[i] = disp;
        mu.row_mut(i).assign(&Array1::from_vec(gene_mu));
    }

    log::debug!(
        "Gene-wise dispersions: {} genes, {} all-zero",
        n_genes,
        dispersions.iter().filter(|d| d.is_nan()).count()
    );
    GeneWiseDispersions { dispersions, mu }
}
