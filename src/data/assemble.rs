//! Transcript quantifications -> gene-level count matrix

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::Serialize;

use super::{CountMatrix, SampleMetadata};
use crate::error::{ReportError, Result};
use crate::io::{find_quant_file, read_quant_file, QuantFormat, TxToGene};

/// Transcript quantification of one sample
#[derive(Debug, Clone)]
pub struct SampleQuant {
    pub sample_id: String,
    pub records: Vec<(String, f64)>,
}

/// Aggregation bookkeeping for one sample
#[derive(Debug, Clone, Serialize)]
pub struct SampleAssembly {
    pub sample_id: String,
    pub source: Option<PathBuf>,
    pub format: Option<QuantFormat>,
    pub n_transcripts: usize,
    pub n_unmapped: usize,
}

/// What happened while building the count matrix
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssemblyReport {
    pub samples: Vec<SampleAssembly>,
    /// Quantification directories without a metadata row
    pub ignored_dirs: Vec<String>,
}

impl AssemblyReport {
    pub fn total_unmapped(&self) -> usize {
        self.samples.iter().map(|s| s.n_unmapped).sum()
    }
}

/// Sum transcript counts into genes.
///
/// Unmapped transcripts are excluded and counted. A sample where nothing maps
/// is an error. Gene sums are rounded, genes are ordered by identifier and
/// columns follow the order of `quants`.
pub fn aggregate_to_genes(
    quants: &[SampleQuant],
    tx2gene: &TxToGene,
) -> Result<(CountMatrix, AssemblyReport)> {
    if quants.is_empty() {
        return Err(ReportError::EmptyData {
            reason: "no samples to assemble".to_string(),
        });
    }

    let mut per_gene: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut report = AssemblyReport::default();
    let n_samples = quants.len();

    for (j, quant) in quants.iter().enumerate() {
        let mut n_unmapped = 0usize;
        for (tx, count) in &quant.records {
            match tx2gene.gene_for(tx) {
                Some(gene) => {
                    per_gene
                        .entry(gene.to_string())
                        .or_insert_with(|| vec![0.0; n_samples])[j] += count;
                }
                None => n_unmapped += 1,
            }
        }

        if !quant.records.is_empty() && n_unmapped == quant.records.len() {
            return Err(ReportError::Mapping {
                sample: quant.sample_id.clone(),
                reason: format!(
                    "none of {} transcripts resolve through the mapping table",
                    quant.records.len()
                ),
            });
        }
        if quant.records.is_empty() {
            return Err(ReportError::Mapping {
                sample: quant.sample_id.clone(),
                reason: "quantification file lists no transcripts".to_string(),
            });
        }
        if n_unmapped > 0 {
            log::warn!(
                "Sample {}: {} of {} transcripts have no gene mapping and were excluded",
                quant.sample_id,
                n_unmapped,
                quant.records.len()
            );
        }

        report.samples.push(SampleAssembly {
            sample_id: quant.sample_id.clone(),
            source: None,
            format: None,
            n_transcripts: quant.records.len(),
            n_unmapped,
        });
    }

    let gene_ids: Vec<String> = per_gene.keys().cloned().collect();
    let mut counts = Array2::zeros((gene_ids.len(), n_samples));
    for (i, sums) in per_gene.values().enumerate() {
        for (j, &value) in sums.iter().enumerate() {
            counts[[i, j]] = value.round();
        }
    }

    let sample_ids = quants.iter().map(|q| q.sample_id.clone()).collect();
    let matrix = CountMatrix::new(counts, gene_ids, sample_ids)?;
    log::info!(
        "Assembled {} genes x {} samples",
        matrix.n_genes(),
        matrix.n_samples()
    );
    Ok((matrix, report))
}

/// Load every metadata sample from `quant_dir/<sample_id>/` and aggregate to genes
pub fn assemble_counts(
    quant_dir: &Path,
    tx2gene: &TxToGene,
    metadata: &SampleMetadata,
) -> Result<(CountMatrix, AssemblyReport)> {
    let known: HashSet<&str> = metadata.sample_ids().iter().map(|s| s.as_str()).collect();
    let mut ignored_dirs = Vec::new();
    for entry in fs::read_dir(quant_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !known.contains(name.as_str()) {
            log::warn!("Quantification directory '{}' has no metadata row; ignored", name);
            ignored_dirs.push(name);
        }
    }
    ignored_dirs.sort();

    let mut quants = Vec::with_capacity(metadata.n_samples());
    let mut sources = Vec::with_capacity(metadata.n_samples());
    for sample_id in metadata.sample_ids() {
        let sample_dir = quant_dir.join(sample_id);
        let (path, format) = find_quant_file(&sample_dir).ok_or_else(|| {
            ReportError::SampleMismatch {
                reason: format!(
                    "sample '{}' has no quantification file under {}",
                    sample_id,
                    sample_dir.display()
                ),
            }
        })?;
        log::debug!("Reading {} ({:?})", path.display(), format);
        let records = read_quant_file(&path, format)?;
        quants.push(SampleQuant {
            sample_id: sample_id.clone(),
            records,
        });
        sources.push((path, format));
    }

    let (matrix, mut report) = aggregate_to_genes(&quants, tx2gene)?;
    for (sample, (path, format)) in report.samples.iter_mut().zip(sources) {
        sample.source = Some(path);
        sample.format = Some(format);
    }
    report.ignored_dirs = ignored_dirs;
    Ok((matrix, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn quant(sample: &str, records: &[(&str, f64)]) -> SampleQuant {
        SampleQuant {
            sample_id: sample.to_string(),
            records: records.iter().map(|(t, c)| (t.to_string(), *c)).collect(),
        }
    }

    fn table() -> TxToGene {
        TxToGene::from_pairs(vec![
            ("ENST1", "GENE_B"),
            ("ENST2", "GENE_B"),
            ("ENST3", "GENE_A"),
        ])
    }

    #[test]
    fn test_sum_round_and_order() {
        let quants = vec![
            quant("s1", &[("ENST1.1", 2.4), ("ENST2.7", 3.4), ("ENST3.2", 1.0)]),
            quant("s2", &[("ENST1.1", 0.0), ("ENST3.2", 9.6)]),
        ];
        let (matrix, report) = aggregate_to_genes(&quants, &table()).unwrap();

        assert_eq!(matrix.gene_ids(), &["GENE_A".to_string(), "GENE_B".to_string()]);
        assert_eq!(matrix.counts()[[1, 0]], 6.0);
        assert_eq!(matrix.counts()[[0, 1]], 10.0);
        assert_eq!(report.total_unmapped(), 0);
    }

    #[test]
    fn test_unmapped_excluded_and_counted() {
        let quants = vec![quant("s1", &[("ENST1", 5.0), ("ENST99", 100.0)])];
        let (matrix, report) = aggregate_to_genes(&quants, &table()).unwrap();
        assert_eq!(matrix.n_genes(), 1);
        assert_eq!(matrix.counts()[[0, 0]], 5.0);
        assert_eq!(report.samples[0].n_unmapped, 1);
    }

    #[test]
    fn test_nothing_mapped_is_error() {
        let quants = vec![quant("s1", &[("ENST98", 5.0), ("ENST99", 1.0)])];
        let err = aggregate_to_genes(&quants, &table()).unwrap_err();
        assert!(matches!(err, ReportError::Mapping { .. }));
    }

    #[test]
    fn test_assemble_from_directory() {
        let dir = tempdir().unwrap();
        for (sample, reads) in [("s1", 4.0), ("s2", 8.0)] {
            let sample_dir = dir.path().join(sample);
            fs::create_dir(&sample_dir).unwrap();
            fs::write(
                sample_dir.join("quant.sf"),
                format!("Name\tLength\tEffectiveLength\tTPM\tNumReads\nENST3.1\t10\t10\t1\t{}\n", reads),
            )
            .unwrap();
        }
        fs::create_dir(dir.path().join("stray")).unwrap();

        let meta = SampleMetadata::new(vec!["s2".to_string(), "s1".to_string()]).unwrap();
        let (matrix, report) = assemble_counts(dir.path(), &table(), &meta).unwrap();
        assert_eq!(matrix.sample_ids(), &["s2".to_string(), "s1".to_string()]);
        assert_eq!(matrix.counts()[[0, 0]], 8.0);
        assert_eq!(report.ignored_dirs, vec!["stray".to_string()]);
        assert_eq!(report.samples[0].format, Some(QuantFormat::Salmon));
    }

    #[test]
    fn test_missing_sample_dir_is_mismatch() {
        let dir = tempdir().unwrap();
        let meta = SampleMetadata::new(vec!["s1".to_string()]).unwrap();
        let err = assemble_counts(dir.path(), &table(), &meta).unwrap_err();
        assert!(matches!(err, ReportError::SampleMismatch { .. }));
    }
}
