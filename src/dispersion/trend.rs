//! Dispersion trend fitting

use std::fmt;

use crate::error::{ReportError, Result};
use crate::stats::cmp_f64;

/// Fitted mean-dispersion relationship
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispersionTrend {
    /// dispersion = asympt_disp + extra_pois / mean
    Parametric { asympt_disp: f64, extra_pois: f64 },
    /// Constant trimmed mean of the gene-wise estimates
    Mean(f64),
}

impl DispersionTrend {
    /// Trended dispersion at a given normalized mean
    pub fn eval(&self, mean: f64) -> f64 {
        match *self {
            DispersionTrend::Parametric {
                asympt_disp,
                extra_pois,
            } => {
                if mean > 0.0 {
                    asympt_disp + extra_pois / mean
                } else {
                    asympt_disp
                }
            }
            DispersionTrend::Mean(value) => value,
        }
    }
}

impl fmt::Display for DispersionTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispersionTrend::Parametric {
                asympt_disp,
                extra_pois,
            } => write!(f, "parametric ({:.4} + {:.4}/mean)", asympt_disp, extra_pois),
            DispersionTrend::Mean(value) => write!(f, "mean ({:.4})", value),
        }
    }
}

/// Fit the trend of gene-wise dispersions against normalized means.
///
/// The parametric fit is tried first; when it fails to converge or yields
/// a non-positive coefficient, the trimmed mean is used instead.
pub fn fit_dispersion_trend(means: &[f64], dispersions: &[f64], min_disp: f64) -> Result<DispersionTrend> {
    if means.len() != dispersions.len() {
        return Err(ReportError::DimensionMismatch {
            expected: format!("{} dispersions", means.len()),
            got: format!("{}", dispersions.len()),
        });
    }

    match fit_parametric(means, dispersions, min_disp) {
        Ok((asympt_disp, extra_pois)) => Ok(DispersionTrend::Parametric {
            asympt_disp,
            extra_pois,
        }),
        Err(e) => {
            log::info!("Parametric dispersion fit failed ({}), using the mean", e);
            mean_trend(dispersions, min_disp).map(DispersionTrend::Mean)
        }
    }
}

fn mean_trend(dispersions: &[f64], min_disp: f64) -> Result<f64> {
    let mut usable: Vec<f64> = dispersions
        .iter()
        .copied()
        .filter(|d| d.is_finite() && *d > 10.0 * min_disp)
        .collect();
    if usable.is_empty() {
        usable = dispersions.iter().copied().filter(|d| d.is_finite()).collect();
    }
    if usable.is_empty() {
        return Err(ReportError::TrendFittingFailed {
            reason: "no finite gene-wise dispersions".to_string(),
        });
    }

    usable.sort_by(cmp_f64);
    let n = usable.len();
    let trim = (n as f64 * 0.001).floor() as usize;
    let kept = &usable[trim..n - trim];
    Ok(kept.iter().sum::<f64>() / kept.len() as f64)
}

/// Iterated gamma GLM (identity link) of dispersion on 1/mean, refitting on
/// genes whose residual ratio lies in (1e-4, 15)
fn fit_parametric(means: &[f64], dispersions: &[f64], min_disp: f64) -> Result<(f64, f64)> {
    let data: Vec<(f64, f64)> = means
        .iter()
        .zip(dispersions)
        .filter(|(&m, &d)| m > 0.0 && d.is_finite() && d > 100.0 * min_disp)
        .map(|(&m, &d)| (m, d))
        .collect();

    if data.len() < 3 {
        return Err(ReportError::TrendFittingFailed {
            reason: format!("{} usable genes", data.len()),
        });
    }

    let mut coefs = (0.1_f64, 1.0_f64);
    for iter in 0..11 {
        let old = coefs;
        let good: Vec<(f64, f64)> = data
            .iter()
            .copied()
            .filter(|&(m, d)| {
                let fitted = coefs.0 + coefs.1 / m;
                fitted > 0.0 && d / fitted > 1e-4 && d / fitted < 15.0
            })
            .collect();
        if good.len() < 3 {
            return Err(ReportError::TrendFittingFailed {
                reason: "too few genes within the residual bounds".to_string(),
            });
        }

        let (next, converged) = gamma_identity_glm(&good, coefs);
        coefs = next;
        if !(coefs.0 > 0.0 && coefs.1 > 0.0) {
            return Err(ReportError::TrendFittingFailed {
                reason: format!("coefficients not positive ({:.4}, {:.4})", coefs.0, coefs.1),
            });
        }

        let change = (coefs.0 / old.0).ln().powi(2) + (coefs.1 / old.1).ln().powi(2);
        log::debug!(
            "Trend iteration {}: {} genes, a0={:.6}, a1={:.6}",
            iter + 1,
            good.len(),
            coefs.0,
            coefs.1
        );
        if change < 1e-6 && converged {
            return Ok(coefs);
        }
    }

    Err(ReportError::TrendFittingFailed {
        reason: "did not converge".to_string(),
    })
}

fn gamma_deviance(data: &[(f64, f64)], a0: f64, a1: f64) -> f64 {
    data.iter()
        .map(|&(m, d)| {
            let mu = (a0 + a1 / m).max(1e-8);
            2.0 * (-(d / mu).ln() + (d - mu) / mu)
        })
        .sum()
}

/// Weighted least squares with weights 1/mu^2, iterated to a stable deviance
fn gamma_identity_glm(data: &[(f64, f64)], start: (f64, f64)) -> ((f64, f64), bool) {
    let (mut a0, mut a1) = start;
    let mut dev_old = gamma_deviance(data, a0, a1);

    for _ in 0..25 {
        let (mut sw, mut swx, mut swy, mut swxx, mut swxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for &(m, d) in data {
            let x = 1.0 / m;
            let mu = (a0 + a1 * x).max(1e-8);
            let w = 1.0 / (mu * mu);
            sw += w;
            swx += w * x;
            swy += w * d;
            swxx += w * x * x;
            swxy += w * x * d;
        }
        let det = sw * swxx - swx * swx;
        if det.abs() < 1e-10 {
            return ((a0, a1), false);
        }
        a0 = (swxx * swy - swx * swxy) / det;
        a1 = (sw * swxy - swx * swy) / det;

        let dev = gamma_deviance(data, a0, a1);
        if (dev_old - dev).abs() / (0.1 + dev.abs()) < 1e-8 {
            return ((a0, a1), true);
        }
        dev_old = dev;
    }
    ((a0, a1), false)
}
