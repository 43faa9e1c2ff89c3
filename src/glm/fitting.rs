//! GLM fitting using Iteratively Reweighted Least Squares (IRLS)

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;

use super::linalg::{invert_spd, solve_spd, weighted_gram};
use super::negative_binomial::{nb_deviance, nb_mean, nb_weight, MAX_BETA, MIN_MU};
use crate::error::{ReportError, Result};

/// Configurable parameters for GLM fitting
#[derive(Debug, Clone)]
pub struct GlmFitParams {
    /// Maximum IRLS iterations
    pub maxit: usize,
    /// Relative deviance change that counts as converged
    pub beta_tol: f64,
    /// Ridge penalty on the log2 scale
    pub lambda_log2: f64,
}

impl Default for GlmFitParams {
    fn default() -> Self {
        Self {
            maxit: 100,
            beta_tol: 1e-8,
            lambda_log2: 1e-6,
        }
    }
}

impl GlmFitParams {
    /// Ridge penalty on the natural-log scale the fit works in
    fn lambda(&self) -> f64 {
        let ln2 = std::f64::consts::LN_2;
        self.lambda_log2 / (ln2 * ln2)
    }
}

/// Fitted NB GLM for one gene. Coefficients are on the natural-log scale.
#[derive(Debug, Clone)]
pub struct GlmFitResult {
    pub coefficients: Vec<f64>,
    pub standard_errors: Vec<f64>,
    pub mu: Vec<f64>,
    pub deviance: f64,
    pub iterations: usize,
}

fn fitted_mu(design: ArrayView2<'_, f64>, beta: &Array1<f64>, size_factors: ArrayView1<'_, f64>) -> Vec<f64> {
    design
        .rows()
        .into_iter()
        .zip(size_factors.iter())
        .map(|(row, &sf)| nb_mean(row.dot(beta), sf).max(MIN_MU))
        .collect()
}

fn ridge(mut gram: Array2<f64>, lambda: f64) -> Array2<f64> {
    for j in 0..gram.nrows() {
        gram[[j, j]] += lambda;
    }
    gram
}

/// Fit log(mu / s) = X beta for one gene with fixed dispersion `alpha`.
///
/// Returns `ReportError::Convergence` when IRLS does not settle within
/// `params.maxit` iterations or a coefficient leaves `|beta| <= 30`.
pub fn fit_single_gene(
    gene_id: &str,
    counts: ArrayView1<'_, f64>,
    design: &Array2<f64>,
    size_factors: ArrayView1<'_, f64>,
    alpha: f64,
    params: &GlmFitParams,
) -> Result<GlmFitResult> {
    let n_samples = counts.len();
    let lambda = params.lambda();
    let y: Vec<f64> = counts.to_vec();
    let fail = |reason: String| ReportError::Convergence {
        gene_id: gene_id.to_string(),
        reason,
    };

    if !(alpha.is_finite() && alpha > 0.0) {
        return Err(fail(format!("dispersion {} is not usable", alpha)));
    }

    // Start from least squares on log(normalized + 0.1)
    let log_norm: Array1<f64> = counts
        .iter()
        .zip(size_factors.iter())
        .map(|(&c, &s)| (c / s + 0.1).ln())
        .collect();
    let xtx = ridge(weighted_gram(design.view(), &vec![1.0; n_samples]), lambda);
    let mut beta = solve_spd(xtx.view(), design.t().dot(&log_norm).view())
        .ok_or_else(|| fail("singular design in starting fit".to_string()))?;

    let mut dev_old = 0.0;
    let mut converged_at = None;
    for iter in 0..params.maxit {
        let mu = fitted_mu(design.view(), &beta, size_factors);
        let weights: Vec<f64> = mu.iter().map(|&m| nb_weight(m, alpha)).collect();
        let z: Array1<f64> = mu
            .iter()
            .zip(&y)
            .zip(size_factors.iter())
            .map(|((&m, &yi), &s)| (m / s).ln() + (yi - m) / m)
            .collect();
        let wz: Array1<f64> = z.iter().zip(&weights).map(|(z, w)| z * w).collect();

        let gram = ridge(weighted_gram(design.view(), &weights), lambda);
        beta = solve_spd(gram.view(), design.t().dot(&wz).view())
            .ok_or_else(|| fail(format!("singular weighted system at iteration {}", iter + 1)))?;

        if beta.iter().any(|b| !b.is_finite() || b.abs() > MAX_BETA) {
            return Err(fail(format!("coefficient exceeded |beta| = {}", MAX_BETA)));
        }

        let dev = nb_deviance(&y, &fitted_mu(design.view(), &beta, size_factors), alpha);
        let conv = (dev - dev_old).abs() / (dev.abs() + 0.1);
        if conv.is_nan() {
            return Err(fail("deviance became undefined".to_string()));
        }
        if iter > 0 && conv < params.beta_tol {
            converged_at = Some(iter + 1);
            break;
        }
        dev_old = dev;
    }

    let iterations = converged_at
        .ok_or_else(|| fail(format!("no convergence after {} iterations", params.maxit)))?;

    let mu = fitted_mu(design.view(), &beta, size_factors);
    let weights: Vec<f64> = mu.iter().map(|&m| nb_weight(m, alpha)).collect();
    let standard_errors = sandwich_standard_errors(design, &weights, lambda)
        .ok_or_else(|| fail("singular information matrix".to_string()))?;

    Ok(GlmFitResult {
        coefficients: beta.to_vec(),
        standard_errors,
        deviance: nb_deviance(&y, &mu, alpha),
        mu,
        iterations,
    })
}

/// sqrt(diag((X'WX + L)^-1 X'WX (X'WX + L)^-1))
fn sandwich_standard_errors(design: &Array2<f64>, weights: &[f64], lambda: f64) -> Option<Vec<f64>> {
    let gram = weighted_gram(design.view(), weights);
    let inv = invert_spd(ridge(gram.clone(), lambda).view())?;
    let sigma = inv.dot(&gram).dot(&inv);
    Some(
        sigma
            .diag()
            .iter()
            .map(|&v| if v > 0.0 { v.sqrt() } else { f64::NAN })
            .collect(),
    )
}

/// Fit every gene in parallel. Genes without a finite dispersion are skipped
/// (`None`); each fitted gene carries its own `Result`.
pub fn fit_glm(
    counts: ArrayView2<'_, f64>,
    gene_ids: &[String],
    design: &Array2<f64>,
    size_factors: ArrayView1<'_, f64>,
    dispersions: &[f64],
    params: &GlmFitParams,
) -> Vec<Option<Result<GlmFitResult>>> {
    (0..counts.nrows())
        .into_par_iter()
        .map(|i| {
            let alpha = dispersions[i];
            if !alpha.is_finite() {
                return None;
            }
            Some(fit_single_gene(
                &gene_ids[i],
                counts.row(i),
                design,
                size_factors,
                alpha,
                params,
            ))
        })
        .collect()
}
