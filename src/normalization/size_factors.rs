//! Size factor estimation using the median of ratios method

use ndarray::{Array1, ArrayView2, Axis};

use crate::error::{ReportError, Result};
use crate::stats::median;

/// Method for size factor estimation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeFactorMethod {
    /// Median of ratios over genes with no zero count
    Ratio,
    /// Geometric mean over the positive counts only, for sparse data
    PosCounts,
}

/// Estimate size factors, falling back to `PosCounts` when no gene is
/// positive in every sample
pub fn estimate_size_factors(counts: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
    match size_factors_with(counts, SizeFactorMethod::Ratio) {
        Err(ReportError::SizeFactorFailed { reason }) => {
            log::warn!("{}; using positive-count geometric means", reason);
            size_factors_with(counts, SizeFactorMethod::PosCounts)
        }
        other => other,
    }
}

/// Estimate size factors with a fixed method
pub fn size_factors_with(
    counts: ArrayView2<'_, f64>,
    method: SizeFactorMethod,
) -> Result<Array1<f64>> {
    let (n_genes, n_samples) = counts.dim();
    if n_genes == 0 || n_samples == 0 {
        return Err(ReportError::EmptyData {
            reason: "Count matrix is empty".to_string(),
        });
    }

    // log geometric mean per gene; None excludes the gene from the reference
    let log_geo_means: Vec<Option<f64>> = counts
        .axis_iter(Axis(0))
        .map(|row| match method {
            SizeFactorMethod::Ratio => row
                .iter()
                .all(|&x| x > 0.0)
                .then(|| row.iter().map(|x| x.ln()).sum::<f64>() / n_samples as f64),
            SizeFactorMethod::PosCounts => {
                // Divide by all samples, not only the positive ones
                let log_sum: f64 = row.iter().filter(|&&x| x > 0.0).map(|x| x.ln()).sum();
                row.iter().any(|&x| x > 0.0).then(|| log_sum / n_samples as f64)
            }
        })
        .collect();

    if log_geo_means.iter().all(|g| g.is_none()) {
        return Err(ReportError::SizeFactorFailed {
            reason: match method {
                SizeFactorMethod::Ratio => "No genes with all non-zero counts found".to_string(),
                SizeFactorMethod::PosCounts => "No genes with positive counts found".to_string(),
            },
        });
    }

    let mut size_factors = Array1::zeros(n_samples);
    for (j, col) in counts.axis_iter(Axis(1)).enumerate() {
        let log_ratios: Vec<f64> = col
            .iter()
            .zip(&log_geo_means)
            .filter_map(|(&count, geo)| match geo {
                Some(g) if count > 0.0 => Some(count.ln() - g),
                _ => None,
            })
            .collect();
        size_factors[j] = if log_ratios.is_empty() {
            1.0
        } else {
            median(&log_ratios).exp()
        };
    }

    if method == SizeFactorMethod::PosCounts {
        // Geometric mean of size factors = 1
        let center = (size_factors.mapv(f64::ln).sum() / n_samples as f64).exp();
        size_factors.mapv_inplace(|x| x / center);
    }

    if size_factors.iter().any(|&x| x <= 0.0 || !x.is_finite()) {
        return Err(ReportError::SizeFactorFailed {
            reason: "Invalid size factors computed".to_string(),
        });
    }

    log::debug!("Size factors ({:?}): {:?}", method, size_factors.to_vec());
    Ok(size_factors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_size_factor_estimation() {
        let counts = array![
            [100.0, 200.0, 80.0, 160.0],
            [500.0, 1000.0, 400.0, 800.0],
            [50.0, 100.0, 40.0, 80.0],
            [200.0, 400.0, 160.0, 320.0]
        ];
        let sf = estimate_size_factors(counts.view()).unwrap();
        assert_eq!(sf.len(), 4);
        assert!(sf.iter().all(|&x| x > 0.0));

        // s2 has 2x the depth of s1
        assert!((sf[1] / sf[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_equal_depth_gives_unit_factors() {
        let counts = array![[10.0, 10.0, 10.0], [50.0, 50.0, 50.0]];
        let sf = estimate_size_factors(counts.view()).unwrap();
        for &s in sf.iter() {
            assert!((s - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_poscounts_fallback() {
        // Every gene has a zero somewhere
        let counts = array![[0.0, 10.0, 20.0], [10.0, 0.0, 20.0], [5.0, 10.0, 0.0]];
        assert!(size_factors_with(counts.view(), SizeFactorMethod::Ratio).is_err());

        let sf = estimate_size_factors(counts.view()).unwrap();
        assert!(sf.iter().all(|&x| x > 0.0 && x.is_finite()));
        let log_mean = sf.iter().map(|x| x.ln()).sum::<f64>() / 3.0;
        assert!(log_mean.abs() < 1e-12);
    }
}
