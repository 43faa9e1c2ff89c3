//! Gene annotation table read from a delimited file

use std::path::Path;

use super::{AnnotationRecord, AnnotationSource};
use crate::error::{ReportError, Result};
use crate::io::{delimited_reader, normalize_id};

/// Annotation records in file order. Columns are found by header name:
/// `gene_id` is required, `symbol`, `gene_name` and `entrez_id` are optional.
#[derive(Debug, Clone)]
pub struct TsvAnnotationSource {
    records: Vec<AnnotationRecord>,
}

fn non_empty(field: Option<&str>) -> Option<String> {
    field.filter(|s| !s.is_empty() && *s != "NA").map(|s| s.to_string())
}

impl TsvAnnotationSource {
    pub fn from_records(records: Vec<AnnotationRecord>) -> Self {
        Self { records }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = delimited_reader(path.as_ref(), true)?;
        let headers = reader.headers()?.clone();
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

        let gene_col = find("gene_id").ok_or_else(|| ReportError::Annotation {
            reason: format!("{} has no gene_id column", path.as_ref().display()),
        })?;
        let (symbol_col, name_col, entrez_col) = (find("symbol"), find("gene_name"), find("entrez_id"));

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record?;
            let Some(gene_id) = record.get(gene_col).filter(|g| !g.is_empty()) else {
                continue;
            };
            records.push(AnnotationRecord {
                gene_id: normalize_id(gene_id).to_string(),
                symbol: non_empty(symbol_col.and_then(|c| record.get(c))),
                gene_name: non_empty(name_col.and_then(|c| record.get(c))),
                entrez_id: non_empty(entrez_col.and_then(|c| record.get(c))),
            });
        }

        log::info!("Read {} annotation records", records.len());
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl AnnotationSource for TsvAnnotationSource {
    fn lookup(&self, gene_ids: &[String]) -> Result<Vec<AnnotationRecord>> {
        let wanted: std::collections::HashSet<&str> = gene_ids.iter().map(|g| normalize_id(g)).collect();
        Ok(self
            .records
            .iter()
            .filter(|r| wanted.contains(r.gene_id.as_str()))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_and_lookup() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "gene_id\tsymbol\tgene_name\tentrez_id").unwrap();
        writeln!(file, "ENSG01.4\tTP53\ttumor protein p53\t7157").unwrap();
        writeln!(file, "ENSG02\tMYC\t\t").unwrap();
        writeln!(file, "ENSG03\tNA\tunnamed\t99").unwrap();
        file.flush().unwrap();

        let source = TsvAnnotationSource::from_path(file.path()).unwrap();
        assert_eq!(source.len(), 3);

        let found = source.lookup(&["ENSG01".to_string(), "ENSG02".to_string()]).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].gene_id, "ENSG01");
        assert_eq!(found[0].symbol.as_deref(), Some("TP53"));
        assert_eq!(found[1].gene_name, None);
        assert_eq!(found[1].entrez_id, None);

        let unnamed = source.lookup(&["ENSG03".to_string()]).unwrap();
        assert_eq!(unnamed[0].symbol, None);
    }

    #[test]
    fn test_missing_gene_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id,symbol").unwrap();
        writeln!(file, "ENSG01,TP53").unwrap();
        file.flush().unwrap();
        let err = TsvAnnotationSource::from_path(file.path()).unwrap_err();
        assert!(matches!(err, ReportError::Annotation { .. }));
    }
}
