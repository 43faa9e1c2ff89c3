//! Differential expression result rows

use std::fmt;

use serde::{Deserialize, Serialize};

/// Adjusted p-value below which a gene can be called significant
pub const PADJ_THRESHOLD: f64 = 0.05;
/// Absolute log2 fold change above which a gene can be called significant
pub const LFC_THRESHOLD: f64 = 2.0;

/// padj < 0.05 and |log2FoldChange| > 2; undefined values never qualify
pub fn is_significant(padj: Option<f64>, log2_fold_change: Option<f64>) -> bool {
    match (padj, log2_fold_change) {
        (Some(p), Some(lfc)) => p < PADJ_THRESHOLD && lfc.abs() > LFC_THRESHOLD,
        _ => false,
    }
}

/// Two-level comparison: `treated` against the `control` baseline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contrast {
    /// Metadata column holding the condition
    pub variable: String,
    pub treated: String,
    pub control: String,
}

impl Contrast {
    pub fn new(variable: &str, treated: &str, control: &str) -> Self {
        Self {
            variable: variable.to_string(),
            treated: treated.to_string(),
            control: control.to_string(),
        }
    }
}

impl fmt::Display for Contrast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} vs {}", self.variable, self.treated, self.control)
    }
}

/// One gene's test result. Statistics are `None` for genes that were
/// all-zero, failed to converge or, for `padj`, were filtered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeResultRow {
    pub gene_id: String,
    #[serde(rename = "baseMean")]
    pub base_mean: f64,
    #[serde(rename = "log2FoldChange")]
    pub log2_fold_change: Option<f64>,
    #[serde(rename = "lfcSE")]
    pub lfc_se: Option<f64>,
    pub stat: Option<f64>,
    pub pvalue: Option<f64>,
    pub padj: Option<f64>,
}

impl DeResultRow {
    pub fn is_significant(&self) -> bool {
        is_significant(self.padj, self.log2_fold_change)
    }
}

/// Per-gene results of one contrast, in count-matrix gene order
#[derive(Debug, Clone, Serialize)]
pub struct DeResults {
    pub contrast: Contrast,
    pub rows: Vec<DeResultRow>,
    pub sample_ids: Vec<String>,
    pub size_factors: Vec<f64>,
    /// Description of the fitted dispersion trend
    pub dispersion_trend: String,
    /// Dispersions were estimated without the design
    pub blind_dispersions: bool,
    /// Genes whose GLM fit did not converge
    pub n_not_converged: usize,
    /// Genes removed by independent filtering
    pub n_filtered: usize,
}

impl DeResults {
    pub fn n_genes(&self) -> usize {
        self.rows.len()
    }

    /// Summary statistics
    pub fn summary(&self) -> ResultsSummary {
        let tested = self.rows.iter().filter(|r| r.pvalue.is_some()).count();
        let significant: Vec<&DeResultRow> = self.rows.iter().filter(|r| r.is_significant()).collect();
        let upregulated = significant
            .iter()
            .filter(|r| r.log2_fold_change.is_some_and(|l| l > 0.0))
            .count();

        ResultsSummary {
            total_genes: self.n_genes(),
            genes_tested: tested,
            not_converged: self.n_not_converged,
            filtered: self.n_filtered,
            significant: significant.len(),
            upregulated,
            downregulated: significant.len() - upregulated,
        }
    }
}

/// Counts of a result set
#[derive(Debug, Clone, Serialize)]
pub struct ResultsSummary {
    pub total_genes: usize,
    pub genes_tested: usize,
    pub not_converged: usize,
    pub filtered: usize,
    pub significant: usize,
    pub upregulated: usize,
    pub downregulated: usize,
}

impl fmt::Display for ResultsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} genes, {} tested, {} significant (padj < {}, |log2FC| > {}: {} up, {} down)",
            self.total_genes,
            self.genes_tested,
            self.significant,
            PADJ_THRESHOLD,
            LFC_THRESHOLD,
            self.upregulated,
            self.downregulated
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_significance_thresholds_are_strict() {
        assert!(is_significant(Some(0.01), Some(2.5)));
        assert!(is_significant(Some(0.01), Some(-2.5)));
        assert!(!is_significant(Some(0.05), Some(3.0)));
        assert!(!is_significant(Some(0.01), Some(2.0)));
        assert!(!is_significant(None, Some(5.0)));
        assert!(!is_significant(Some(0.001), None));
    }

    #[test]
    fn test_summary_counts() {
        let row = |id: &str, lfc: Option<f64>, padj: Option<f64>| DeResultRow {
            gene_id: id.to_string(),
            base_mean: 10.0,
            log2_fold_change: lfc,
            lfc_se: lfc.map(|_| 0.3),
            stat: lfc,
            pvalue: padj,
            padj,
        };
        let results = DeResults {
            contrast: Contrast::new("condition", "treated", "control"),
            rows: vec![
                row("a", Some(3.0), Some(0.001)),
                row("b", Some(-4.0), Some(0.01)),
                row("c", Some(0.1), Some(0.9)),
                row("d", None, None),
            ],
            sample_ids: vec![],
            size_factors: vec![],
            dispersion_trend: String::new(),
            blind_dispersions: false,
            n_not_converged: 1,
            n_filtered: 0,
        };
        let summary = results.summary();
        assert_eq!(summary.genes_tested, 3);
        assert_eq!(summary.significant, 2);
        assert_eq!(summary.upregulated, 1);
        assert_eq!(summary.downregulated, 1);
        assert!(summary.to_string().contains("2 significant"));
    }
}
