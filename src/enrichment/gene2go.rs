//! NCBI gene2go annotations, propagated up the ontology

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use super::ontology::{Ontology, BIOLOGICAL_PROCESS};
use crate::error::{ReportError, Result};
use crate::io::commented_reader;

const TAX_COL: usize = 0;
const GENE_COL: usize = 1;
const GO_COL: usize = 2;
const QUALIFIER_COL: usize = 4;
const CATEGORY_COL: usize = 7;

/// Biological-process terms per Entrez gene, closed under ancestors
#[derive(Debug, Clone, Default)]
pub struct GeneAnnotations {
    gene_terms: BTreeMap<String, BTreeSet<String>>,
}

impl GeneAnnotations {
    /// Build from direct (gene, term) pairs. Terms outside the biological
    /// process namespace or unknown to the ontology are ignored.
    pub fn from_pairs<I>(pairs: I, ontology: &Ontology) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut gene_terms: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut closures: HashMap<String, BTreeSet<String>> = HashMap::new();
        for (gene, term) in pairs {
            let Some(go) = ontology.term(&term) else {
                continue;
            };
            if go.namespace != BIOLOGICAL_PROCESS {
                continue;
            }
            let closure = closures.entry(term).or_insert_with_key(|term| {
                let mut set = ontology.ancestors(term);
                set.insert(term.clone());
                set
            });
            gene_terms
                .entry(gene)
                .or_default()
                .extend(closure.iter().cloned());
        }
        Self { gene_terms }
    }

    pub fn terms_for(&self, gene: &str) -> Option<&BTreeSet<String>> {
        self.gene_terms.get(gene)
    }

    pub fn is_annotated(&self, gene: &str) -> bool {
        self.gene_terms.contains_key(gene)
    }

    pub fn n_genes(&self) -> usize {
        self.gene_terms.len()
    }
}

/// Read `gene2go` (tax_id, GeneID, GO_ID, Evidence, Qualifier, GO_term,
/// PubMed, Category), keeping `Process` rows without a NOT qualifier.
/// With `tax_id` set, rows of other organisms are skipped.
pub fn read_gene2go<P: AsRef<Path>>(
    path: P,
    ontology: &Ontology,
    tax_id: Option<&str>,
) -> Result<GeneAnnotations> {
    let mut reader = commented_reader(path.as_ref())?;
    let mut pairs = Vec::new();
    let mut other_taxa = 0usize;
    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() <= CATEGORY_COL {
            return Err(ReportError::Ontology {
                reason: format!(
                    "gene2go row {} has {} columns, expected 8",
                    row_idx + 1,
                    record.len()
                ),
            });
        }
        if tax_id.is_some_and(|t| &record[TAX_COL] != t) {
            other_taxa += 1;
            continue;
        }
        if &record[CATEGORY_COL] != "Process" || record[QUALIFIER_COL].starts_with("NOT") {
            continue;
        }
        pairs.push((record[GENE_COL].to_string(), record[GO_COL].to_string()));
    }
    if other_taxa > 0 {
        log::debug!("Skipped {} gene2go rows of other organisms", other_taxa);
    }

    let annotations = GeneAnnotations::from_pairs(pairs, ontology);
    log::info!("Read biological process annotations for {} genes", annotations.n_genes());
    Ok(annotations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::ontology::tests::OBO;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_filters_and_propagates() {
        let ontology = Ontology::parse_obo(OBO).unwrap();
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "#tax_id\tGeneID\tGO_ID\tEvidence\tQualifier\tGO_term\tPubMed\tCategory").unwrap();
        writeln!(file, "9606\t7157\tGO:0097190\tIDA\tinvolved_in\tapoptotic signaling pathway\t123\tProcess").unwrap();
        writeln!(file, "9606\t7157\tGO:0005575\tIDA\tlocated_in\tcellular_component\t-\tComponent").unwrap();
        writeln!(file, "9606\t4609\tGO:0006915\tIDA\tNOT involved_in\tapoptotic process\t-\tProcess").unwrap();
        writeln!(file, "9606\t4610\tGO:9999999\tIEA\tinvolved_in\tunknown\t-\tProcess").unwrap();
        file.flush().unwrap();

        let annotations = read_gene2go(file.path(), &ontology, Some("9606")).unwrap();
        assert_eq!(annotations.n_genes(), 1);
        let terms: Vec<&String> = annotations.terms_for("7157").unwrap().iter().collect();
        assert_eq!(terms, vec!["GO:0006915", "GO:0008150", "GO:0009987", "GO:0097190"]);
        assert!(!annotations.is_annotated("4609"));
    }

    #[test]
    fn test_taxon_filter() {
        let ontology = Ontology::parse_obo(OBO).unwrap();
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "#tax_id\tGeneID\tGO_ID\tEvidence\tQualifier\tGO_term\tPubMed\tCategory").unwrap();
        writeln!(file, "9606\t7157\tGO:0097190\tIDA\tinvolved_in\tapoptotic signaling pathway\t-\tProcess").unwrap();
        writeln!(file, "10090\t22059\tGO:0097190\tIDA\tinvolved_in\tapoptotic signaling pathway\t-\tProcess").unwrap();
        file.flush().unwrap();

        let human = read_gene2go(file.path(), &ontology, Some("9606")).unwrap();
        assert!(human.is_annotated("7157"));
        assert!(!human.is_annotated("22059"));

        let all = read_gene2go(file.path(), &ontology, None).unwrap();
        assert_eq!(all.n_genes(), 2);
    }

    #[test]
    fn test_shared_term_closure() {
        let ontology = Ontology::parse_obo(OBO).unwrap();
        let pairs = vec![
            ("1".to_string(), "GO:0097190".to_string()),
            ("2".to_string(), "GO:0097190".to_string()),
            ("2".to_string(), "GO:0009987".to_string()),
        ];
        let annotations = GeneAnnotations::from_pairs(pairs, &ontology);
        assert_eq!(annotations.terms_for("1"), annotations.terms_for("2"));
        assert!(annotations.terms_for("1").unwrap().contains("GO:0008150"));
    }
}
