//! Negative binomial GLM engine with Wald testing

use crate::data::ExperimentDataset;
use crate::dispersion::{estimate_dispersions, DispersionParams};
use crate::error::{ReportError, Result};
use crate::filter::independent_filtering;
use crate::glm::{create_design_matrix, fit_glm, GlmFitParams};
use crate::normalization::{base_mean_and_var, estimate_size_factors, normalized_counts};
use crate::testing::wald_test;

use super::{Contrast, DeResultRow, DeResults, DifferentialExpressionEngine};

/// Size factors, dispersion shrinkage, IRLS fits, Wald tests, independent
/// filtering and BH adjustment
#[derive(Debug, Clone)]
pub struct NegativeBinomialEngine {
    pub dispersion: DispersionParams,
    pub glm: GlmFitParams,
    /// Significance level used to choose the independent filter
    pub filter_alpha: f64,
}

impl Default for NegativeBinomialEngine {
    fn default() -> Self {
        Self {
            dispersion: DispersionParams::default(),
            glm: GlmFitParams::default(),
            filter_alpha: 0.1,
        }
    }
}

fn defined(x: f64) -> Option<f64> {
    x.is_finite().then_some(x)
}

impl DifferentialExpressionEngine for NegativeBinomialEngine {
    fn test(&self, dataset: &ExperimentDataset, contrast: &Contrast) -> Result<DeResults> {
        if dataset.design_variable() != contrast.variable {
            return Err(ReportError::InvalidDesign {
                reason: format!(
                    "dataset compares '{}' but the contrast is on '{}'",
                    dataset.design_variable(),
                    contrast.variable
                ),
            });
        }

        let counts = dataset.counts();
        let (design, info) = create_design_matrix(
            dataset.sample_metadata(),
            &contrast.variable,
            &contrast.control,
            &contrast.treated,
        )?;
        log::debug!("Design coefficients: {}", info.coef_names.join(", "));

        let size_factors = estimate_size_factors(counts.counts())?;
        let dispersions = estimate_dispersions(counts.counts(), size_factors.view(), &design, &self.dispersion)?;

        let normalized = normalized_counts(counts.counts(), size_factors.view())?;
        let (base_means, _) = base_mean_and_var(normalized.view());

        let fits = fit_glm(
            counts.counts(),
            counts.gene_ids(),
            &design,
            size_factors.view(),
            &dispersions.map.to_vec(),
            &self.glm,
        );
        let (stats, n_not_converged) = wald_test(&fits, 1);
        if n_not_converged > 0 {
            log::warn!(
                "{} of {} genes did not converge and are reported without statistics",
                n_not_converged,
                counts.n_genes()
            );
        }

        log::debug!(
            "{}: {} genes with a defined Wald p-value",
            contrast,
            stats.iter().filter(|s| s.is_defined()).count()
        );

        let base_means = base_means.to_vec();
        let pvalues: Vec<f64> = stats.iter().map(|s| s.pvalue).collect();
        let filter = independent_filtering(&base_means, &pvalues, self.filter_alpha);

        let rows = counts
            .gene_ids()
            .iter()
            .zip(&base_means)
            .zip(stats.iter().zip(&filter.padj))
            .map(|((gene_id, &base_mean), (s, &padj))| DeResultRow {
                gene_id: gene_id.clone(),
                base_mean,
                log2_fold_change: defined(s.log2_fold_change),
                lfc_se: defined(s.lfc_se),
                stat: defined(s.stat),
                pvalue: defined(s.pvalue),
                padj: defined(padj),
            })
            .collect();

        let results = DeResults {
            contrast: contrast.clone(),
            rows,
            sample_ids: counts.sample_ids().to_vec(),
            size_factors: size_factors.to_vec(),
            dispersion_trend: dispersions.trend.to_string(),
            blind_dispersions: dispersions.blind,
            n_not_converged,
            n_filtered: filter.n_filtered,
        };
        log::info!("{}: {}", contrast, results.summary());
        Ok(results)
    }
}
