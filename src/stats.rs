//! Statistical utility functions shared across modules
//!
//! Quantiles, robust scale and the trigamma function used by the
//! dispersion prior, independent filtering and the QC summaries.

use std::cmp::Ordering;

/// Consistency constant so that MAD estimates the normal standard deviation
const MAD_CONSTANT: f64 = 1.4826;

/// Total order on f64 for sorting, NaN sorted last
pub fn cmp_f64(a: &f64, b: &f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
    }
}

/// Sorted copy of the finite values
pub fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(cmp_f64);
    sorted
}

/// Type-7 quantile (linear interpolation between order statistics) of sorted data
///
/// `h = (n - 1) * p`, result = `x[floor(h)] + frac(h) * (x[ceil(h)] - x[floor(h)])`
pub fn quantile_type7(sorted_x: &[f64], p: f64) -> f64 {
    let n = sorted_x.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted_x[0];
    }

    let h = (n as f64 - 1.0) * p.clamp(0.0, 1.0);
    let lo = (h.floor() as usize).min(n - 1);
    let hi = (h.ceil() as usize).min(n - 1);

    if lo == hi {
        sorted_x[lo]
    } else {
        let frac = h - lo as f64;
        sorted_x[lo] + frac * (sorted_x[hi] - sorted_x[lo])
    }
}

/// Median of the finite values, NaN when there are none
pub fn median(values: &[f64]) -> f64 {
    quantile_type7(&sorted_finite(values), 0.5)
}

/// Squared median absolute deviation, scaled for normal consistency
pub fn mad_squared(values: &[f64]) -> f64 {
    let center = median(values);
    if !center.is_finite() {
        return 0.0;
    }
    let abs_devs: Vec<f64> = values
        .iter()
        .filter(|v| v.is_finite())
        .map(|&v| (v - center).abs())
        .collect();
    let mad = median(&abs_devs) * MAD_CONSTANT;
    mad * mad
}

/// Mean and unbiased sample variance of a slice
pub fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let mean = values.iter().sum::<f64>() / n;
    let var = if values.len() > 1 {
        values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)
    } else {
        0.0
    };
    (mean, var)
}

/// Trigamma function (derivative of digamma)
pub fn trigamma(x: f64) -> f64 {
    if x < 0.5 {
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).powi(2) - trigamma(1.0 - x);
    }

    if x >= 8.0 {
        let x2 = x * x;
        return 1.0 / x + 0.5 / x2 + 1.0 / (6.0 * x2 * x) - 1.0 / (30.0 * x2 * x2 * x)
            + 1.0 / (42.0 * x2 * x2 * x2 * x);
    }

    // Recurrence: trigamma(x) = 1/x^2 + trigamma(x + 1)
    let mut result = 0.0;
    let mut z = x;
    while z < 8.0 {
        result += 1.0 / (z * z);
        z += 1.0;
    }
    result + trigamma(z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_type7() {
        let x = vec![1.0, 2.0, 3.0, 4.0];
        assert!((quantile_type7(&x, 0.5) - 2.5).abs() < 1e-12);
        assert!((quantile_type7(&x, 0.25) - 1.75).abs() < 1e-12);
        assert_eq!(quantile_type7(&x, 0.0), 1.0);
        assert_eq!(quantile_type7(&x, 1.0), 4.0);
        assert!(quantile_type7(&[], 0.5).is_nan());
    }

    #[test]
    fn test_median_ignores_nan() {
        assert_eq!(median(&[3.0, f64::NAN, 1.0, 2.0]), 2.0);
    }

    #[test]
    fn test_trigamma_known_values() {
        // trigamma(1) = pi^2 / 6
        let expected = std::f64::consts::PI.powi(2) / 6.0;
        assert!((trigamma(1.0) - expected).abs() < 1e-8);
        // trigamma(0.5) = pi^2 / 2
        let expected_half = std::f64::consts::PI.powi(2) / 2.0;
        assert!((trigamma(0.5) - expected_half).abs() < 1e-8);
    }

    #[test]
    fn test_mad_squared() {
        // median 3, |dev| = [2,1,0,1,2] -> median 1
        let mad2 = mad_squared(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!((mad2 - MAD_CONSTANT * MAD_CONSTANT).abs() < 1e-12);
    }

    #[test]
    fn test_cmp_nan_last() {
        let mut v = vec![f64::NAN, 2.0, 1.0];
        v.sort_by(cmp_f64);
        assert_eq!(v[0], 1.0);
        assert_eq!(v[1], 2.0);
        assert!(v[2].is_nan());
    }
}
