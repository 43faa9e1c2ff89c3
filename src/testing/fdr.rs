//! Benjamini-Hochberg false discovery rate adjustment

use std::cmp::Ordering;

/// Benjamini-Hochberg adjusted p-values.
///
/// NaN p-values are left out of the test count and stay NaN.
pub fn benjamini_hochberg(pvalues: &[f64]) -> Vec<f64> {
    let mut padj = vec![f64::NAN; pvalues.len()];
    let mut order: Vec<usize> = (0..pvalues.len()).filter(|&i| pvalues[i].is_finite()).collect();
    let m = order.len();
    if m == 0 {
        return padj;
    }

    order.sort_by(|&a, &b| pvalues[a].partial_cmp(&pvalues[b]).unwrap_or(Ordering::Equal));

    let mut running_min = 1.0_f64;
    for (rank, &i) in order.iter().enumerate().rev() {
        let adjusted = pvalues[i] * m as f64 / (rank + 1) as f64;
        running_min = running_min.min(adjusted);
        padj[i] = running_min;
    }
    padj
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bh_known_values() {
        let padj = benjamini_hochberg(&[0.01, 0.04, 0.03, 0.02]);
        for adj in &padj {
            assert!((adj - 0.04).abs() < 1e-12);
        }

        let padj = benjamini_hochberg(&[0.001, 0.01, 0.05, 0.5]);
        assert!((padj[0] - 0.004).abs() < 1e-12);
        assert!((padj[1] - 0.02).abs() < 1e-12);
        assert!((padj[2] - 0.2 / 3.0).abs() < 1e-12);
        assert!((padj[3] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_bh_with_nan() {
        let padj = benjamini_hochberg(&[0.01, f64::NAN, 0.03, 0.02]);
        assert!(padj[1].is_nan());
        assert!((padj[0] - 0.03).abs() < 1e-12);
        assert!((padj[2] - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_bh_bounded_by_one() {
        let padj = benjamini_hochberg(&[0.9, 0.95, 0.99]);
        assert!(padj.iter().all(|&p| p <= 1.0 && p >= 0.9));
        assert!(benjamini_hochberg(&[]).is_empty());
    }
}
