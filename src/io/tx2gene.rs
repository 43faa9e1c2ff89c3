//! Transcript to gene mapping table

use std::collections::HashMap;
use std::path::Path;

use super::csv::delimited_reader;
use crate::error::{ReportError, Result};

/// Canonical form of a transcript or gene identifier.
///
/// GENCODE FASTA headers (`ENST...|ENSG...|...`) are cut at the first `|`, then
/// the version suffix is cut at the first `.`, so `ENST000001.3` and
/// `ENST000001` resolve to the same key.
pub fn normalize_id(id: &str) -> &str {
    let id = id.trim();
    let id = id.split('|').next().unwrap_or(id);
    id.split('.').next().unwrap_or(id)
}

/// Transcript -> gene lookup keyed by normalized transcript identifier
#[derive(Debug, Clone, Default)]
pub struct TxToGene {
    map: HashMap<String, String>,
}

impl TxToGene {
    /// Build from (transcript, gene) pairs; the first mapping of a transcript wins
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        let mut map = HashMap::new();
        let mut conflicts = 0usize;
        for (tx, gene) in pairs {
            let tx = normalize_id(tx.as_ref()).to_string();
            let gene = normalize_id(gene.as_ref()).to_string();
            if tx.is_empty() || gene.is_empty() {
                continue;
            }
            match map.get(&tx) {
                Some(existing) if existing != &gene => conflicts += 1,
                Some(_) => {}
                None => {
                    map.insert(tx, gene);
                }
            }
        }
        if conflicts > 0 {
            log::warn!(
                "{} transcripts map to more than one gene; keeping the first mapping",
                conflicts
            );
        }
        Self { map }
    }

    /// Gene for a transcript identifier (any version suffix is ignored)
    pub fn gene_for(&self, transcript_id: &str) -> Option<&str> {
        self.map.get(normalize_id(transcript_id)).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn looks_like_header(first: &str, second: &str) -> bool {
    let first = first.to_ascii_lowercase();
    let second = second.to_ascii_lowercase();
    (first.contains("transcript") || first.starts_with("tx")) && second.contains("gene")
}

/// Read a two-column mapping table (transcript, gene), tab or comma separated,
/// with an optional header row
pub fn read_tx2gene<P: AsRef<Path>>(path: P) -> Result<TxToGene> {
    let mut reader = delimited_reader(path.as_ref(), false)?;

    let mut pairs: Vec<(String, String)> = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        if record.len() < 2 {
            return Err(ReportError::InvalidInput {
                reason: format!(
                    "mapping table row {} has {} column(s), expected transcript and gene",
                    row_idx + 1,
                    record.len()
                ),
            });
        }
        if row_idx == 0 && looks_like_header(&record[0], &record[1]) {
            continue;
        }
        pairs.push((record[0].to_string(), record[1].to_string()));
    }

    let table = TxToGene::from_pairs(pairs);
    if table.is_empty() {
        return Err(ReportError::EmptyData {
            reason: "transcript to gene mapping table is empty".to_string(),
        });
    }
    log::info!("Read {} transcript to gene mappings", table.len());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_version_suffix_resolves() {
        let table = TxToGene::from_pairs(vec![("ENST000001", "ENSG000001")]);
        assert_eq!(table.gene_for("ENST000001.3"), Some("ENSG000001"));
        assert_eq!(table.gene_for("ENST000001"), Some("ENSG000001"));
        assert_eq!(table.gene_for("ENST000002.1"), None);
    }

    #[test]
    fn test_gencode_header_resolves() {
        let table = TxToGene::from_pairs(vec![("ENST000001.2", "ENSG000001.5")]);
        assert_eq!(
            table.gene_for("ENST000001.3|ENSG000001.5|OTTHUMG1|-|GENE-201|GENE|1200|"),
            Some("ENSG000001")
        );
    }

    #[test]
    fn test_first_mapping_wins() {
        let table = TxToGene::from_pairs(vec![("t1", "gA"), ("t1.2", "gB")]);
        assert_eq!(table.gene_for("t1"), Some("gA"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_read_with_and_without_header() {
        let mut with_header = NamedTempFile::new().unwrap();
        writeln!(with_header, "transcript_id\tgene_id").unwrap();
        writeln!(with_header, "ENST1.1\tENSG1").unwrap();
        writeln!(with_header, "ENST2.4\tENSG1").unwrap();
        let table = read_tx2gene(with_header.path()).unwrap();
        assert_eq!(table.len(), 2);

        let mut bare = NamedTempFile::new().unwrap();
        writeln!(bare, "ENST1,ENSG1").unwrap();
        let table = read_tx2gene(bare.path()).unwrap();
        assert_eq!(table.gene_for("ENST1.9"), Some("ENSG1"));
    }
}
