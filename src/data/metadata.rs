//! Sample metadata

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{ReportError, Result};

/// Sample metadata containing categorical sample annotations
/// (cell line, treatment condition, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleMetadata {
    /// Sample identifiers
    sample_ids: Vec<String>,
    /// Column names in file order
    column_order: Vec<String>,
    /// Categorical columns (column name -> value for each sample)
    conditions: HashMap<String, Vec<String>>,
}

impl SampleMetadata {
    /// Create new sample metadata; sample identifiers must be unique
    pub fn new(sample_ids: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::new();
        for id in &sample_ids {
            if !seen.insert(id) {
                return Err(ReportError::InvalidMetadata {
                    reason: format!("Duplicate sample ID '{}'", id),
                });
            }
        }
        Ok(Self {
            sample_ids,
            column_order: Vec::new(),
            conditions: HashMap::new(),
        })
    }

    /// Add a categorical column
    pub fn add_condition(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if values.len() != self.sample_ids.len() {
            return Err(ReportError::DimensionMismatch {
                expected: format!("{} values", self.sample_ids.len()),
                got: format!("{} values", values.len()),
            });
        }
        if self.conditions.insert(name.to_string(), values).is_none() {
            self.column_order.push(name.to_string());
        }
        Ok(())
    }

    /// Check if a column exists
    pub fn has_condition(&self, name: &str) -> bool {
        self.conditions.contains_key(name)
    }

    /// Get the value of a column for a specific sample
    pub fn get_value(&self, condition: &str, sample_idx: usize) -> Result<&str> {
        self.conditions
            .get(condition)
            .and_then(|v| v.get(sample_idx))
            .map(|s| s.as_str())
            .ok_or_else(|| ReportError::InvalidInput {
                reason: format!(
                    "column '{}' or sample index {} not found",
                    condition, sample_idx
                ),
            })
    }

    /// Get sample IDs
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Get number of samples
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Get the values of a column
    pub fn condition(&self, name: &str) -> Option<&Vec<String>> {
        self.conditions.get(name)
    }

    /// Unique levels of a column (sorted)
    pub fn levels(&self, condition_name: &str) -> Option<Vec<String>> {
        self.conditions.get(condition_name).map(|values| {
            let mut unique: Vec<String> = values.to_vec();
            unique.sort();
            unique.dedup();
            unique
        })
    }

    /// Indices of samples whose column value equals `level`
    pub fn samples_with_level(&self, condition_name: &str, level: &str) -> Vec<usize> {
        self.conditions
            .get(condition_name)
            .map(|values| {
                values
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| v.as_str() == level)
                    .map(|(i, _)| i)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Subset metadata to specific samples
    pub fn subset(&self, sample_indices: &[usize]) -> Result<Self> {
        let new_ids: Vec<String> = sample_indices
            .iter()
            .map(|&i| self.sample_ids[i].clone())
            .collect();

        let mut new_meta = SampleMetadata::new(new_ids)?;

        for name in &self.column_order {
            let values = &self.conditions[name];
            let new_values: Vec<String> = sample_indices
                .iter()
                .map(|&i| values[i].clone())
                .collect();
            new_meta.add_condition(name, new_values)?;
        }

        Ok(new_meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sample_metadata() {
        let mut meta = SampleMetadata::new(strings(&["s1", "s2", "s3", "s4"])).unwrap();
        meta.add_condition("condition", strings(&["control", "control", "treated", "treated"]))
            .unwrap();

        let levels = meta.levels("condition").unwrap();
        assert_eq!(levels, vec!["control", "treated"]);
        assert_eq!(meta.samples_with_level("condition", "control"), vec![0, 1]);
        assert_eq!(meta.get_value("condition", 2).unwrap(), "treated");
    }

    #[test]
    fn test_duplicate_samples_rejected() {
        assert!(SampleMetadata::new(strings(&["s1", "s1"])).is_err());
    }
}
