//! Per-sample transcript quantification files

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{ReportError, Result};

/// Supported quantifier outputs, probed in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuantFormat {
    /// Salmon `quant.sf`
    Salmon,
    /// kallisto `abundance.tsv`
    Kallisto,
    /// Generic two-column `quant.tsv`
    Generic,
}

impl QuantFormat {
    pub const ALL: [QuantFormat; 3] = [QuantFormat::Salmon, QuantFormat::Kallisto, QuantFormat::Generic];

    pub fn file_name(&self) -> &'static str {
        match self {
            QuantFormat::Salmon => "quant.sf",
            QuantFormat::Kallisto => "abundance.tsv",
            QuantFormat::Generic => "quant.tsv",
        }
    }

    /// (identifier column, estimated count column)
    fn columns(&self) -> (&'static str, &'static str) {
        match self {
            QuantFormat::Salmon => ("Name", "NumReads"),
            QuantFormat::Kallisto => ("target_id", "est_counts"),
            QuantFormat::Generic => ("transcript_id", "count"),
        }
    }
}

/// First recognised quantification file inside a sample directory
pub fn find_quant_file(sample_dir: &Path) -> Option<(PathBuf, QuantFormat)> {
    QuantFormat::ALL.iter().find_map(|format| {
        let path = sample_dir.join(format.file_name());
        path.is_file().then_some((path, *format))
    })
}

/// Read (transcript id, estimated count) pairs from a quantification file
pub fn read_quant_file(path: &Path, format: QuantFormat) -> Result<Vec<(String, f64)>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let (id_col, count_col) = format.columns();
    let headers = reader.headers()?.clone();
    let locate = |name: &str| {
        headers.iter().position(|h| h == name).ok_or_else(|| ReportError::InvalidCountMatrix {
            reason: format!("{}: missing column '{}'", path.display(), name),
        })
    };
    let id_idx = locate(id_col)?;
    let count_idx = locate(count_col)?;

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        let (Some(id), Some(raw)) = (record.get(id_idx), record.get(count_idx)) else {
            continue;
        };
        let count: f64 = raw.parse().map_err(|_| ReportError::InvalidCountMatrix {
            reason: format!("{}: invalid count '{}' for {}", path.display(), raw, id),
        })?;
        if !count.is_finite() || count < 0.0 {
            return Err(ReportError::InvalidCountMatrix {
                reason: format!("{}: negative or non-finite count for {}", path.display(), id),
            });
        }
        records.push((id.to_string(), count));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_read_salmon() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("quant.sf"),
            "Name\tLength\tEffectiveLength\tTPM\tNumReads\n\
             ENST1.1\t1000\t800\t12.5\t10.4\n\
             ENST2.2\t500\t300\t1.0\t3\n",
        )
        .unwrap();

        let (path, format) = find_quant_file(dir.path()).unwrap();
        assert_eq!(format, QuantFormat::Salmon);
        let records = read_quant_file(&path, format).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, "ENST1.1");
        assert!((records[0].1 - 10.4).abs() < 1e-12);
    }

    #[test]
    fn test_read_kallisto() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("abundance.tsv"),
            "target_id\tlength\teff_length\test_counts\ttpm\nENST9.1\t100\t80\t7\t1.2\n",
        )
        .unwrap();
        let (path, format) = find_quant_file(dir.path()).unwrap();
        assert_eq!(format, QuantFormat::Kallisto);
        assert_eq!(read_quant_file(&path, format).unwrap()[0].1, 7.0);
    }

    #[test]
    fn test_missing_file_and_column() {
        let dir = tempdir().unwrap();
        assert!(find_quant_file(dir.path()).is_none());

        fs::write(dir.path().join("quant.tsv"), "transcript_id\treads\nENST1\t3\n").unwrap();
        let (path, format) = find_quant_file(dir.path()).unwrap();
        assert!(read_quant_file(&path, format).is_err());
    }
}
