//! ExperimentDataset - count matrix bound to its sample metadata

use super::{CountMatrix, SampleMetadata};
use crate::error::{ReportError, Result};

/// The unit of analysis: one count matrix, its sample metadata and the
/// metadata column that defines the groups being compared.
///
/// A dataset is never mutated. Narrowing with [`ExperimentDataset::subset`]
/// returns a new, independent dataset.
#[derive(Debug, Clone)]
pub struct ExperimentDataset {
    counts: CountMatrix,
    sample_metadata: SampleMetadata,
    design_variable: String,
}

impl ExperimentDataset {
    /// Bind counts to metadata. Count columns and metadata rows must list the
    /// same samples in the same order.
    pub fn new(
        counts: CountMatrix,
        sample_metadata: SampleMetadata,
        design_variable: &str,
    ) -> Result<Self> {
        if counts.sample_ids() != sample_metadata.sample_ids() {
            let missing: Vec<&str> = counts
                .sample_ids()
                .iter()
                .filter(|id| !sample_metadata.sample_ids().contains(id))
                .map(|s| s.as_str())
                .collect();
            return Err(ReportError::SampleMismatch {
                reason: if missing.is_empty() {
                    "count matrix columns and metadata rows are not in the same order".to_string()
                } else {
                    format!("samples without metadata: {}", missing.join(", "))
                },
            });
        }

        if !sample_metadata.has_condition(design_variable) {
            return Err(ReportError::InvalidDesign {
                reason: format!("Design variable '{}' not found in metadata", design_variable),
            });
        }

        if let Some(levels) = sample_metadata.levels(design_variable) {
            if levels.len() < 2 {
                log::warn!(
                    "Design variable '{}' has only one level ('{}')",
                    design_variable,
                    levels.first().map(|s| s.as_str()).unwrap_or(""),
                );
            }
        }

        Ok(Self {
            counts,
            sample_metadata,
            design_variable: design_variable.to_string(),
        })
    }

    pub fn counts(&self) -> &CountMatrix {
        &self.counts
    }

    pub fn sample_metadata(&self) -> &SampleMetadata {
        &self.sample_metadata
    }

    pub fn design_variable(&self) -> &str {
        &self.design_variable
    }

    pub fn n_genes(&self) -> usize {
        self.counts.n_genes()
    }

    pub fn n_samples(&self) -> usize {
        self.counts.n_samples()
    }

    /// Narrow to the samples whose `column` equals `level`
    pub fn subset(&self, column: &str, level: &str) -> Result<Self> {
        if !self.sample_metadata.has_condition(column) {
            return Err(ReportError::InvalidInput {
                reason: format!("Column '{}' not found in metadata", column),
            });
        }

        let indices = self.sample_metadata.samples_with_level(column, level);
        if indices.is_empty() {
            return Err(ReportError::EmptyData {
                reason: format!("No samples with {} = '{}'", column, level),
            });
        }

        let counts = self.counts.subset_samples(&indices)?;
        let metadata = self.sample_metadata.subset(&indices)?;
        log::debug!(
            "Subset {} = '{}': {} of {} samples",
            column,
            level,
            indices.len(),
            self.n_samples()
        );
        Self::new(counts, metadata, &self.design_variable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::collections::HashSet;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn two_line_dataset() -> ExperimentDataset {
        let samples = strings(&["a1", "a2", "b1", "b2", "a3", "b3"]);
        let counts = CountMatrix::new(
            array![
                [10.0, 12.0, 100.0, 110.0, 11.0, 90.0],
                [5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
            ],
            strings(&["g1", "g2"]),
            samples.clone(),
        )
        .unwrap();
        let mut meta = SampleMetadata::new(samples).unwrap();
        meta.add_condition(
            "cell_line",
            strings(&["HT55", "HT55", "SW948", "SW948", "HT55", "SW948"]),
        )
        .unwrap();
        meta.add_condition(
            "condition",
            strings(&["control", "treated", "control", "treated", "treated", "control"]),
        )
        .unwrap();
        ExperimentDataset::new(counts, meta, "condition").unwrap()
    }

    #[test]
    fn test_subset_is_pure_filter() {
        let dds = two_line_dataset();
        let ht55 = dds.subset("cell_line", "HT55").unwrap();
        let sw948 = dds.subset("cell_line", "SW948").unwrap();

        for (i, id) in dds.counts().sample_ids().iter().enumerate() {
            let line = dds.sample_metadata().get_value("cell_line", i).unwrap();
            assert_eq!(ht55.counts().sample_ids().contains(id), line == "HT55");
        }

        let a: HashSet<&String> = ht55.counts().sample_ids().iter().collect();
        let b: HashSet<&String> = sw948.counts().sample_ids().iter().collect();
        let all: HashSet<&String> = dds.counts().sample_ids().iter().collect();
        assert!(a.is_disjoint(&b));
        assert_eq!(a.union(&b).copied().collect::<HashSet<_>>(), all);

        // Parent untouched
        assert_eq!(dds.n_samples(), 6);
        assert_eq!(ht55.design_variable(), "condition");
        assert_eq!(ht55.counts().counts()[[0, 2]], 11.0);
    }

    #[test]
    fn test_mismatched_samples_rejected() {
        let counts = CountMatrix::new(array![[1.0, 2.0]], strings(&["g1"]), strings(&["x", "y"]))
            .unwrap();
        let mut meta = SampleMetadata::new(strings(&["x", "z"])).unwrap();
        meta.add_condition("condition", strings(&["control", "treated"])).unwrap();
        let err = ExperimentDataset::new(counts, meta, "condition").unwrap_err();
        assert!(matches!(err, ReportError::SampleMismatch { .. }));
    }

    #[test]
    fn test_subset_unknown_level() {
        let dds = two_line_dataset();
        assert!(dds.subset("cell_line", "HCT116").is_err());
        assert!(dds.subset("tissue", "colon").is_err());
    }
}
