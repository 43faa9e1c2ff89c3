//! Negative binomial distribution utilities

use statrs::function::gamma::ln_gamma;

/// Floor on fitted means during IRLS
pub const MIN_MU: f64 = 0.5;

/// Coefficients beyond this magnitude (natural log scale) mark a failed fit
pub const MAX_BETA: f64 = 30.0;

/// Clamp on the linear predictor to keep exp() finite
const MAX_ETA: f64 = 700.0;

/// mu = size_factor * exp(eta)
pub fn nb_mean(eta: f64, size_factor: f64) -> f64 {
    size_factor * eta.clamp(-MAX_ETA, MAX_ETA).exp()
}

/// IRLS working weight mu / (1 + alpha * mu)
pub fn nb_weight(mu: f64, alpha: f64) -> f64 {
    mu / (1.0 + alpha * mu)
}

/// log P(Y = y) for mean `mu` and dispersion `alpha` (size = 1/alpha)
pub fn nb_log_likelihood(y: f64, mu: f64, alpha: f64) -> f64 {
    if mu <= 0.0 || alpha <= 0.0 {
        return f64::NEG_INFINITY;
    }
    let size = 1.0 / alpha;
    let prob = size / (size + mu);
    ln_gamma(y + size) - ln_gamma(size) - ln_gamma(y + 1.0)
        + size * prob.ln()
        + y * (1.0 - prob).ln()
}

/// Deviance -2 * sum(log-likelihood) of a count vector
pub fn nb_deviance(counts: &[f64], mu: &[f64], alpha: f64) -> f64 {
    counts
        .iter()
        .zip(mu)
        .map(|(&y, &m)| -2.0 * nb_log_likelihood(y, m, alpha))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nb_mean_and_weight() {
        assert!((nb_mean(2.0, 1.0) - 2.0_f64.exp()).abs() < 1e-10);
        assert!((nb_weight(10.0, 0.1) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_poisson_limit() {
        // alpha -> 0 approaches Poisson(5) at y = 5
        let ll = nb_log_likelihood(5.0, 5.0, 1e-8);
        let poisson = 5.0 * 5.0_f64.ln() - 5.0 - ln_gamma(6.0);
        assert!((ll - poisson).abs() < 1e-5);
    }

    #[test]
    fn test_invalid_parameters() {
        assert_eq!(nb_log_likelihood(1.0, 0.0, 0.1), f64::NEG_INFINITY);
        assert_eq!(nb_log_likelihood(1.0, 1.0, 0.0), f64::NEG_INFINITY);
    }
}
