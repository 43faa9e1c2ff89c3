//! Over-representation of GO biological-process categories among
//! significant genes

mod dag;
mod gene2go;
mod hypergeometric;
mod ontology;

pub use dag::{category_dag, CategoryDag, DagEdge, DagNode};
pub use gene2go::{read_gene2go, GeneAnnotations};
pub use hypergeometric::{EnrichmentParams, HypergeometricEnrichment};
pub use ontology::{GoTerm, Ontology, BIOLOGICAL_PROCESS};

#[cfg(test)]
pub(crate) use ontology::tests::OBO as TEST_OBO;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::annotation::AnnotatedResults;
use crate::error::Result;

/// Significant genes and their background, as Entrez identifiers
#[derive(Debug, Clone, Default)]
pub struct EnrichmentQuery {
    pub genes: BTreeSet<String>,
    pub universe: BTreeSet<String>,
    /// Display label (symbol) per Entrez identifier
    pub labels: BTreeMap<String, String>,
    /// Significant genes dropped for lack of an Entrez identifier
    pub n_dropped: usize,
}

impl EnrichmentQuery {
    /// Remap significant genes and the tested universe to Entrez identifiers.
    /// Genes without one are dropped and counted.
    pub fn from_results(results: &AnnotatedResults) -> Self {
        let mut query = Self::default();
        for row in results.rows.iter().filter(|r| r.pvalue.is_some()) {
            let Some(entrez) = row.entrez_id.as_ref() else {
                if row.significant {
                    query.n_dropped += 1;
                }
                continue;
            };
            query.universe.insert(entrez.clone());
            query
                .labels
                .entry(entrez.clone())
                .or_insert_with(|| row.symbol.clone().unwrap_or_else(|| entrez.clone()));
            if row.significant {
                query.genes.insert(entrez.clone());
            }
        }
        if query.n_dropped > 0 {
            log::warn!(
                "{}: {} significant genes have no Entrez identifier and are left out of enrichment",
                results.contrast,
                query.n_dropped
            );
        }
        query
    }

    pub fn label<'a>(&'a self, entrez: &'a str) -> &'a str {
        self.labels.get(entrez).map(|s| s.as_str()).unwrap_or(entrez)
    }
}

/// Non-fatal reasons for an empty enrichment result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnrichmentWarning {
    /// No significant gene remained after remapping to the annotated universe
    NoQueryGenes,
    /// No category passed the cutoffs
    NoSignificantCategories,
}

impl fmt::Display for EnrichmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrichmentWarning::NoQueryGenes => write!(f, "no query genes after remapping"),
            EnrichmentWarning::NoSignificantCategories => write!(f, "no category passed the cutoff"),
        }
    }
}

/// One enriched category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentRow {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Description")]
    pub description: String,
    /// k/n
    #[serde(rename = "GeneRatio")]
    pub gene_ratio: String,
    /// M/N
    #[serde(rename = "BgRatio")]
    pub bg_ratio: String,
    pub pvalue: f64,
    #[serde(rename = "p.adjust")]
    pub p_adjust: f64,
    pub qvalue: f64,
    /// Symbols joined by '/'
    #[serde(rename = "geneID")]
    pub gene_labels: String,
    #[serde(rename = "Count")]
    pub count: usize,
    /// k / n as a number
    pub ratio: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichmentResult {
    pub rows: Vec<EnrichmentRow>,
    pub warning: Option<EnrichmentWarning>,
    /// Query genes in the annotated universe (n)
    pub n_query: usize,
    /// Annotated universe size (N)
    pub n_universe: usize,
}

impl EnrichmentResult {
    pub fn empty(warning: EnrichmentWarning, n_query: usize, n_universe: usize) -> Self {
        Self {
            rows: Vec::new(),
            warning: Some(warning),
            n_query,
            n_universe,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Category over-representation test
pub trait EnrichmentEngine {
    /// An empty query yields an empty result with a warning, never an error
    fn enrich(&self, query: &EnrichmentQuery) -> Result<EnrichmentResult>;
}
