//! Hypergeometric over-representation analysis

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use statrs::distribution::{DiscreteCDF, Hypergeometric};

use super::gene2go::{read_gene2go, GeneAnnotations};
use super::ontology::Ontology;
use super::{EnrichmentEngine, EnrichmentQuery, EnrichmentResult, EnrichmentRow, EnrichmentWarning};
use crate::error::{ReportError, Result};
use crate::stats::cmp_f64;
use crate::testing::benjamini_hochberg;

pub const HUMAN_TAX_ID: &str = "9606";

/// Category size limits and significance cutoffs
#[derive(Debug, Clone)]
pub struct EnrichmentParams {
    pub min_gs_size: usize,
    pub max_gs_size: usize,
    pub pvalue_cutoff: f64,
    pub qvalue_cutoff: f64,
    /// NCBI taxon kept from gene2go; `None` keeps every organism
    pub tax_id: Option<String>,
}

impl Default for EnrichmentParams {
    fn default() -> Self {
        Self {
            min_gs_size: 10,
            max_gs_size: 500,
            pvalue_cutoff: 0.05,
            qvalue_cutoff: 0.05,
            tax_id: Some(HUMAN_TAX_ID.to_string()),
        }
    }
}

/// GO biological-process enrichment over propagated gene2go annotations
#[derive(Debug, Clone)]
pub struct HypergeometricEnrichment {
    ontology: Ontology,
    annotations: GeneAnnotations,
    params: EnrichmentParams,
}

/// Counts for one candidate category
struct Candidate<'a> {
    term: &'a str,
    hits: Vec<&'a str>,
    size: usize,
    pvalue: f64,
}

impl HypergeometricEnrichment {
    pub fn new(ontology: Ontology, annotations: GeneAnnotations, params: EnrichmentParams) -> Self {
        Self {
            ontology,
            annotations,
            params,
        }
    }

    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(
        obo: P,
        gene2go: Q,
        params: EnrichmentParams,
    ) -> Result<Self> {
        let ontology = Ontology::from_obo(obo)?;
        let annotations = read_gene2go(gene2go, &ontology, params.tax_id.as_deref())?;
        Ok(Self::new(ontology, annotations, params))
    }

    pub fn ontology(&self) -> &Ontology {
        &self.ontology
    }
}

impl EnrichmentEngine for HypergeometricEnrichment {
    fn enrich(&self, query: &EnrichmentQuery) -> Result<EnrichmentResult> {
        let universe: BTreeSet<&str> = query
            .universe
            .iter()
            .map(|g| g.as_str())
            .filter(|g| self.annotations.is_annotated(g))
            .collect();
        let genes: BTreeSet<&str> = query
            .genes
            .iter()
            .map(|g| g.as_str())
            .filter(|g| universe.contains(g))
            .collect();
        let (big_n, n) = (universe.len(), genes.len());

        if n == 0 {
            log::warn!("Enrichment: {}", EnrichmentWarning::NoQueryGenes);
            return Ok(EnrichmentResult::empty(EnrichmentWarning::NoQueryGenes, 0, big_n));
        }

        let mut term_genes: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for &gene in &universe {
            for term in self.annotations.terms_for(gene).into_iter().flatten() {
                term_genes.entry(term.as_str()).or_default().push(gene);
            }
        }

        let mut candidates = Vec::new();
        for (&term, members) in &term_genes {
            let size = members.len();
            if size < self.params.min_gs_size || size > self.params.max_gs_size {
                continue;
            }
            let hits: Vec<&str> = members.iter().copied().filter(|g| genes.contains(g)).collect();
            if hits.is_empty() {
                continue;
            }
            let dist = Hypergeometric::new(big_n as u64, size as u64, n as u64).map_err(|e| {
                ReportError::Ontology {
                    reason: format!("hypergeometric for {}: {}", term, e),
                }
            })?;
            candidates.push(Candidate {
                term,
                pvalue: dist.sf(hits.len() as u64 - 1),
                hits,
                size,
            });
        }

        let padj = benjamini_hochberg(&candidates.iter().map(|c| c.pvalue).collect::<Vec<_>>());
        let mut rows: Vec<EnrichmentRow> = candidates
            .iter()
            .zip(padj)
            .filter(|(c, p)| {
                c.pvalue < self.params.pvalue_cutoff && *p < self.params.pvalue_cutoff && *p <= self.params.qvalue_cutoff
            })
            .map(|(c, p)| EnrichmentRow {
                id: c.term.to_string(),
                description: self
                    .ontology
                    .term(c.term)
                    .map(|t| t.name.clone())
                    .unwrap_or_default(),
                gene_ratio: format!("{}/{}", c.hits.len(), n),
                bg_ratio: format!("{}/{}", c.size, big_n),
                pvalue: c.pvalue,
                p_adjust: p,
                qvalue: p,
                gene_labels: c.hits.iter().map(|g| query.label(g)).collect::<Vec<_>>().join("/"),
                count: c.hits.len(),
                ratio: c.hits.len() as f64 / n as f64,
            })
            .collect();
        rows.sort_by(|a, b| cmp_f64(&a.pvalue, &b.pvalue));

        log::info!(
            "Enrichment: {} of {} query genes in a universe of {}; {} categories tested, {} enriched",
            n,
            query.genes.len(),
            big_n,
            candidates.len(),
            rows.len()
        );

        if rows.is_empty() {
            log::warn!("Enrichment: {}", EnrichmentWarning::NoSignificantCategories);
            return Ok(EnrichmentResult::empty(EnrichmentWarning::NoSignificantCategories, n, big_n));
        }
        Ok(EnrichmentResult {
            rows,
            warning: None,
            n_query: n,
            n_universe: big_n,
        })
    }
}
