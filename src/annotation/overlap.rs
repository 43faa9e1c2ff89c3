//! Overlap of significant genes between two result sets

use std::collections::BTreeSet;

use serde::Serialize;

use super::AnnotatedResults;
use crate::engine::PADJ_THRESHOLD;

/// Gene counts of a two-set overlap diagram
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlapCounts {
    pub label_a: String,
    pub label_b: String,
    pub only_a: usize,
    pub only_b: usize,
    pub both: usize,
    pub neither: usize,
}

fn padj_significant(results: &AnnotatedResults) -> BTreeSet<&str> {
    results
        .rows
        .iter()
        .filter(|r| r.padj.is_some_and(|p| p < PADJ_THRESHOLD))
        .map(|r| r.gene_id.as_str())
        .collect()
}

/// Align two result sets by gene and count genes with padj < 0.05 in
/// either, both or neither. Fold change plays no part.
pub fn overlap(a: &AnnotatedResults, b: &AnnotatedResults, label_a: &str, label_b: &str) -> OverlapCounts {
    let genes: BTreeSet<&str> = a
        .rows
        .iter()
        .chain(b.rows.iter())
        .map(|r| r.gene_id.as_str())
        .collect();
    let (sig_a, sig_b) = (padj_significant(a), padj_significant(b));

    let mut counts = OverlapCounts {
        label_a: label_a.to_string(),
        label_b: label_b.to_string(),
        only_a: 0,
        only_b: 0,
        both: 0,
        neither: 0,
    };
    for gene in genes {
        match (sig_a.contains(gene), sig_b.contains(gene)) {
            (true, true) => counts.both += 1,
            (true, false) => counts.only_a += 1,
            (false, true) => counts.only_b += 1,
            (false, false) => counts.neither += 1,
        }
    }
    counts
}
