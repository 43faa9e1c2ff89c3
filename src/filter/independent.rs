//! Independent filtering of low-count genes before multiple testing

use crate::stats::{quantile_type7, sorted_finite};
use crate::testing::benjamini_hochberg;

const N_THETA: usize = 50;

/// Chosen filter and the adjusted p-values it produced
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// NaN for filtered or untested genes
    pub padj: Vec<f64>,
    pub theta: f64,
    /// Genes with base mean below this were filtered
    pub cutoff: f64,
    pub rejections: usize,
    pub n_filtered: usize,
}

/// Filter on base mean and BH-adjust the remaining p-values.
///
/// Cut-offs are base-mean quantiles at 50 evenly spaced thetas from the
/// fraction of zero-mean genes to 0.95. The first theta whose rejections at
/// `alpha` reach 90% of the maximum is used; with at most 10 rejections
/// anywhere, nothing is filtered.
pub fn independent_filtering(base_means: &[f64], pvalues: &[f64], alpha: f64) -> FilterOutcome {
    let n = base_means.len();
    let unfiltered = || {
        let padj = benjamini_hochberg(pvalues);
        FilterOutcome {
            rejections: count_rejections(&padj, alpha),
            padj,
            theta: 0.0,
            cutoff: 0.0,
            n_filtered: 0,
        }
    };

    let sorted_means = sorted_finite(base_means);
    if n == 0 || sorted_means.is_empty() {
        return unfiltered();
    }

    let zero_fraction = base_means.iter().filter(|&&m| m == 0.0 || !m.is_finite()).count() as f64 / n as f64;
    let upper = if zero_fraction < 0.95 { 0.95 } else { 1.0 };

    let candidates: Vec<(f64, f64, Vec<f64>, usize)> = (0..N_THETA)
        .map(|j| {
            let theta = zero_fraction + (upper - zero_fraction) * j as f64 / (N_THETA - 1) as f64;
            let cutoff = quantile_type7(&sorted_means, theta);
            let kept: Vec<f64> = pvalues
                .iter()
                .zip(base_means)
                .map(|(&p, &m)| if m >= cutoff { p } else { f64::NAN })
                .collect();
            let padj = benjamini_hochberg(&kept);
            let rejections = count_rejections(&padj, alpha);
            (theta, cutoff, padj, rejections)
        })
        .collect();

    let max_rej = candidates.iter().map(|c| c.3).max().unwrap_or(0);
    if max_rej <= 10 {
        log::debug!("Independent filtering skipped: at most {} rejections", max_rej);
        return unfiltered();
    }

    let target = 0.9 * max_rej as f64;
    let Some((theta, cutoff, padj, rejections)) = candidates.into_iter().find(|c| c.3 as f64 >= target) else {
        return unfiltered();
    };
    let n_filtered = base_means.iter().filter(|&&m| m < cutoff).count();

    log::debug!(
        "Independent filtering: theta {:.3}, cutoff {:.2}, {} rejections (max {}), {} genes filtered",
        theta,
        cutoff,
        rejections,
        max_rej,
        n_filtered
    );
    FilterOutcome {
        padj,
        theta,
        cutoff,
        rejections,
        n_filtered,
    }
}

fn count_rejections(padj: &[f64], alpha: f64) -> usize {
    padj.iter().filter(|&&p| p.is_finite() && p < alpha).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_few_rejections_not_filtered() {
        let means = [0.0, 5.0, 10.0, 100.0];
        let pvalues = [f64::NAN, 0.5, 0.01, 0.001];
        let out = independent_filtering(&means, &pvalues, 0.1);
        assert_eq!(out.n_filtered, 0);
        assert_eq!(out.padj, benjamini_hochberg(&pvalues));
    }

    #[test]
    fn test_low_mean_null_genes_filtered() {
        // 100 low-mean null genes and 40 high-mean true positives
        let mut means = vec![];
        let mut pvalues = vec![];
        for i in 0..100 {
            means.push(1.0 + i as f64 * 0.01);
            pvalues.push(0.2 + 0.008 * i as f64);
        }
        for i in 0..40 {
            means.push(500.0 + i as f64);
            pvalues.push(0.004 + 0.0001 * i as f64);
        }
        let out = independent_filtering(&means, &pvalues, 0.1);
        assert!(out.rejections >= 36);
        assert!(out.cutoff >= 1.0);
        for (p, m) in out.padj.iter().zip(&means) {
            if *m < out.cutoff {
                assert!(p.is_nan());
            }
        }
    }
}
