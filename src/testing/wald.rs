//! Wald test for a single design coefficient

use std::f64::consts::LN_2;

use super::pvalue::calculate_pvalue;
use crate::error::{ReportError, Result};
use crate::glm::GlmFitResult;

/// Log2-scale Wald statistics of one gene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaldStatistics {
    pub log2_fold_change: f64,
    pub lfc_se: f64,
    pub stat: f64,
    pub pvalue: f64,
}

impl WaldStatistics {
    /// Statistics of a gene that could not be tested
    pub fn undefined() -> Self {
        Self {
            log2_fold_change: f64::NAN,
            lfc_se: f64::NAN,
            stat: f64::NAN,
            pvalue: f64::NAN,
        }
    }

    pub fn is_defined(&self) -> bool {
        self.pvalue.is_finite()
    }
}

/// z = beta / SE for coefficient `coef` of a fitted gene
pub fn wald_statistics(fit: &GlmFitResult, coef: usize) -> WaldStatistics {
    let (Some(&beta), Some(&se)) = (fit.coefficients.get(coef), fit.standard_errors.get(coef)) else {
        return WaldStatistics::undefined();
    };
    if !(se.is_finite() && se > 0.0) {
        return WaldStatistics::undefined();
    }
    let stat = beta / se;
    WaldStatistics {
        log2_fold_change: beta / LN_2,
        lfc_se: se / LN_2,
        stat,
        pvalue: calculate_pvalue(stat),
    }
}

/// Wald statistics for every gene.
///
/// Genes that were not fitted or whose fit failed to converge get undefined
/// statistics. Returns the statistics and the number of convergence failures.
pub fn wald_test(fits: &[Option<Result<GlmFitResult>>], coef: usize) -> (Vec<WaldStatistics>, usize) {
    let mut failures = 0;
    let stats = fits
        .iter()
        .map(|fit| match fit {
            Some(Ok(fit)) => wald_statistics(fit, coef),
            Some(Err(e)) => {
                if let ReportError::Convergence { gene_id, reason } = e {
                    log::debug!("Gene {} left untested: {}", gene_id, reason);
                }
                failures += 1;
                WaldStatistics::undefined()
            }
            None => WaldStatistics::undefined(),
        })
        .collect();
    (stats, failures)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit(beta: f64, se: f64) -> GlmFitResult {
        GlmFitResult {
            coefficients: vec![2.0, beta],
            standard_errors: vec![0.1, se],
            mu: vec![],
            deviance: 0.0,
            iterations: 3,
        }
    }

    #[test]
    fn test_log2_scale() {
        let w = wald_statistics(&fit(LN_2 * 3.0, LN_2 * 0.5), 1);
        assert!((w.log2_fold_change - 3.0).abs() < 1e-12);
        assert!((w.lfc_se - 0.5).abs() < 1e-12);
        assert!((w.stat - 6.0).abs() < 1e-12);
        assert!(w.pvalue < 1e-8);
    }

    #[test]
    fn test_zero_se_is_undefined() {
        assert!(!wald_statistics(&fit(1.0, 0.0), 1).is_defined());
        assert!(!wald_statistics(&fit(1.0, 0.2), 5).is_defined());
    }

    #[test]
    fn test_failures_counted() {
        let fits = vec![
            Some(Ok(fit(1.0, 0.5))),
            Some(Err(ReportError::Convergence {
                gene_id: "g2".to_string(),
                reason: "no convergence".to_string(),
            })),
            None,
        ];
        let (stats, failures) = wald_test(&fits, 1);
        assert_eq!(failures, 1);
        assert!(stats[0].is_defined());
        assert!(!stats[1].is_defined());
        assert!(!stats[2].is_defined());
    }
}
