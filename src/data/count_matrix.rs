//! Gene-level count matrix

use std::collections::HashSet;

use ndarray::{Array2, ArrayView2, Axis};

use crate::error::{ReportError, Result};

/// First identifier that occurs more than once
fn first_duplicate(ids: &[String]) -> Option<&str> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().find(|id| !seen.insert(id.as_str())).map(|s| s.as_str())
}

/// Read counts per gene and sample
/// Rows are genes, columns are samples
#[derive(Debug, Clone)]
pub struct CountMatrix {
    /// Raw count data (genes x samples)
    counts: Array2<f64>,
    /// Gene identifiers (unique)
    gene_ids: Vec<String>,
    /// Sample identifiers (unique)
    sample_ids: Vec<String>,
}

impl CountMatrix {
    /// Create a new count matrix from raw data
    pub fn new(
        counts: Array2<f64>,
        gene_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (n_genes, n_samples) = counts.dim();

        if gene_ids.len() != n_genes {
            return Err(ReportError::DimensionMismatch {
                expected: format!("{} gene IDs", n_genes),
                got: format!("{} gene IDs", gene_ids.len()),
            });
        }

        if sample_ids.len() != n_samples {
            return Err(ReportError::DimensionMismatch {
                expected: format!("{} sample IDs", n_samples),
                got: format!("{} sample IDs", sample_ids.len()),
            });
        }

        if counts.iter().any(|&x| x < 0.0 || !x.is_finite()) {
            return Err(ReportError::InvalidCountMatrix {
                reason: "Counts must be non-negative finite values".to_string(),
            });
        }

        if let Some(dup) = first_duplicate(&gene_ids) {
            return Err(ReportError::InvalidCountMatrix {
                reason: format!("Duplicate gene identifier '{}'", dup),
            });
        }

        if let Some(dup) = first_duplicate(&sample_ids) {
            return Err(ReportError::InvalidCountMatrix {
                reason: format!("Duplicate sample identifier '{}'", dup),
            });
        }

        if counts.iter().any(|&x| x != x.round()) {
            log::warn!(
                "Some count values are not integers; the negative binomial model \
                 expects integer counts"
            );
        }

        Ok(Self {
            counts,
            gene_ids,
            sample_ids,
        })
    }

    /// Get the number of genes
    pub fn n_genes(&self) -> usize {
        self.counts.nrows()
    }

    /// Get the number of samples
    pub fn n_samples(&self) -> usize {
        self.counts.ncols()
    }

    /// Get the raw counts as a view
    pub fn counts(&self) -> ArrayView2<'_, f64> {
        self.counts.view()
    }

    /// Get gene IDs
    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    /// Get sample IDs
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Subset to specific samples, in the given order
    pub fn subset_samples(&self, sample_indices: &[usize]) -> Result<Self> {
        let new_counts = self.counts.select(Axis(1), sample_indices);
        let new_sample_ids: Vec<String> = sample_indices
            .iter()
            .map(|&i| self.sample_ids[i].clone())
            .collect();

        Self::new(new_counts, self.gene_ids.clone(), new_sample_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    #[test]
    fn test_count_matrix_creation() {
        let counts = array![[10.0, 20.0, 30.0], [5.0, 15.0, 25.0]];
        let matrix = CountMatrix::new(counts, ids("gene", 2), ids("s", 3)).unwrap();
        assert_eq!(matrix.n_genes(), 2);
        assert_eq!(matrix.n_samples(), 3);
        assert_eq!(matrix.gene_ids()[1], "gene2");
    }

    #[test]
    fn test_negative_counts_rejected() {
        let counts = array![[10.0, -5.0], [5.0, 15.0]];
        assert!(CountMatrix::new(counts, ids("gene", 2), ids("s", 2)).is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let counts = array![[10.0, 5.0], [5.0, 15.0]];
        let genes = vec!["g".to_string(), "g".to_string()];
        let err = CountMatrix::new(counts, genes, ids("s", 2)).unwrap_err();
        assert!(matches!(err, ReportError::InvalidCountMatrix { .. }));
    }

    #[test]
    fn test_subset_samples() {
        let counts = array![[10.0, 20.0, 1.0], [5.0, 15.0, 2.0]];
        let matrix = CountMatrix::new(counts, ids("gene", 2), ids("s", 3)).unwrap();

        let sub = matrix.subset_samples(&[2, 0]).unwrap();
        assert_eq!(sub.sample_ids(), &["s3".to_string(), "s1".to_string()]);
        assert_eq!(sub.counts()[[1, 0]], 2.0);
    }
}
