//! Gene annotation: record sources, the result join and cross-set overlap

mod join;
mod overlap;
mod tsv;

pub use join::{annotate, cmp_padj, AnnotatedResults, AnnotatedRow};
pub use overlap::{overlap, OverlapCounts};
pub use tsv::TsvAnnotationSource;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Symbol, name and Entrez identifier of one gene
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub gene_id: String,
    pub symbol: Option<String>,
    pub gene_name: Option<String>,
    pub entrez_id: Option<String>,
}

/// Anything that can annotate gene identifiers
pub trait AnnotationSource {
    /// Records for the requested genes. Order is the source's own and may
    /// contain several records for one gene.
    fn lookup(&self, gene_ids: &[String]) -> Result<Vec<AnnotationRecord>>;
}
