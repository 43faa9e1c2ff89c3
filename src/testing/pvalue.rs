//! P-value calculation from test statistics

use statrs::function::erf::erfc;

/// Two-sided p-value of a standard normal statistic, NaN when undefined
pub fn calculate_pvalue(z: f64) -> f64 {
    if !z.is_finite() {
        return f64::NAN;
    }
    erfc(z.abs() / std::f64::consts::SQRT_2).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pvalue_symmetric() {
        assert!((calculate_pvalue(2.0) - calculate_pvalue(-2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_pvalue_known_values() {
        assert!((calculate_pvalue(0.0) - 1.0).abs() < 1e-12);
        assert!((calculate_pvalue(1.959964) - 0.05).abs() < 1e-6);
        assert!(calculate_pvalue(40.0) < 1e-300);
    }

    #[test]
    fn test_pvalue_undefined() {
        assert!(calculate_pvalue(f64::NAN).is_nan());
        assert!(calculate_pvalue(f64::INFINITY).is_nan());
    }
}
