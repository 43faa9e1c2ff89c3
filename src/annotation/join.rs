//! Left join of test results with gene annotation

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use super::{AnnotationRecord, AnnotationSource};
use crate::engine::{is_significant, Contrast, DeResults};
use crate::error::Result;

/// One gene with its statistics and annotation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedRow {
    pub gene_id: String,
    pub symbol: Option<String>,
    pub gene_name: Option<String>,
    pub entrez_id: Option<String>,
    #[serde(rename = "baseMean")]
    pub base_mean: f64,
    #[serde(rename = "log2FoldChange")]
    pub log2_fold_change: Option<f64>,
    #[serde(rename = "lfcSE")]
    pub lfc_se: Option<f64>,
    pub stat: Option<f64>,
    pub pvalue: Option<f64>,
    pub padj: Option<f64>,
    pub significant: bool,
}

impl AnnotatedRow {
    /// Symbol when known, otherwise the gene identifier
    pub fn label(&self) -> &str {
        self.symbol.as_deref().unwrap_or(&self.gene_id)
    }
}

/// Annotated results sorted by ascending padj, undefined padj last
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedResults {
    pub contrast: Contrast,
    pub rows: Vec<AnnotatedRow>,
    /// Annotation records dropped because an earlier record had the same gene
    pub n_duplicates: usize,
    pub n_unannotated: usize,
}

impl AnnotatedResults {
    pub fn significant(&self) -> impl Iterator<Item = &AnnotatedRow> {
        self.rows.iter().filter(|r| r.significant)
    }

    pub fn n_significant(&self) -> usize {
        self.significant().count()
    }

    /// First `n` rows of the ranking
    pub fn top(&self, n: usize) -> &[AnnotatedRow] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// First `n` ranked rows with both padj and a finite fold change. Volcano
    /// labels and heatmap rows are drawn from this set.
    pub fn labelled(&self, n: usize) -> Vec<&AnnotatedRow> {
        self.rows
            .iter()
            .filter(|r| r.padj.is_some() && r.log2_fold_change.is_some_and(f64::is_finite))
            .take(n)
            .collect()
    }

    pub fn gene_ids(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.gene_id.as_str()).collect()
    }
}

/// Ascending padj; undefined values sort after every defined value
pub fn cmp_padj(a: &Option<f64>, b: &Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Attach annotation to every result row.
///
/// Every result row is kept. When the source returns more than one record
/// for a gene the first one wins; the number dropped is logged because the
/// outcome depends on the source's order.
pub fn annotate(results: &DeResults, source: &dyn AnnotationSource) -> Result<AnnotatedResults> {
    let gene_ids: Vec<String> = results.rows.iter().map(|r| r.gene_id.clone()).collect();
    let records = source.lookup(&gene_ids)?;

    let mut by_gene: HashMap<String, AnnotationRecord> = HashMap::with_capacity(records.len());
    let mut n_duplicates = 0;
    for record in records {
        if by_gene.contains_key(&record.gene_id) {
            n_duplicates += 1;
        } else {
            by_gene.insert(record.gene_id.clone(), record);
        }
    }
    if n_duplicates > 0 {
        log::warn!(
            "{}: dropped {} duplicate annotation records (first occurrence kept; depends on source order)",
            results.contrast,
            n_duplicates
        );
    }

    let mut n_unannotated = 0;
    let mut rows: Vec<AnnotatedRow> = results
        .rows
        .iter()
        .map(|r| {
            let record = by_gene.get(&r.gene_id);
            if record.is_none() {
                n_unannotated += 1;
            }
            AnnotatedRow {
                gene_id: r.gene_id.clone(),
                symbol: record.and_then(|a| a.symbol.clone()),
                gene_name: record.and_then(|a| a.gene_name.clone()),
                entrez_id: record.and_then(|a| a.entrez_id.clone()),
                base_mean: r.base_mean,
                log2_fold_change: r.log2_fold_change,
                lfc_se: r.lfc_se,
                stat: r.stat,
                pvalue: r.pvalue,
                padj: r.padj,
                significant: is_significant(r.padj, r.log2_fold_change),
            }
        })
        .collect();

    rows.sort_by(|a, b| cmp_padj(&a.padj, &b.padj));

    log::debug!(
        "{}: annotated {} genes, {} without annotation",
        results.contrast,
        rows.len(),
        n_unannotated
    );
    Ok(AnnotatedResults {
        contrast: results.contrast.clone(),
        rows,
        n_duplicates,
        n_unannotated,
    })
}
