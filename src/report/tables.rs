//! Result tables written beside the report

use std::path::Path;

use serde::Serialize;

use crate::annotation::AnnotatedResults;
use crate::enrichment::EnrichmentResult;
use crate::error::Result;
use crate::io::write_matrix;
use crate::transform::VstResult;

/// Full annotated result set in ranked order; undefined statistics are empty cells
pub fn write_de_table(path: &Path, results: &AnnotatedResults) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in &results.rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Enriched categories, best first. An empty result still gets a header.
pub fn write_enrichment_table(path: &Path, result: &EnrichmentResult) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    if result.rows.is_empty() {
        writer.write_record([
            "ID",
            "Description",
            "GeneRatio",
            "BgRatio",
            "pvalue",
            "p.adjust",
            "qvalue",
            "geneID",
            "Count",
            "ratio",
        ])?;
    }
    for row in &result.rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Transformed matrix, genes x samples
pub fn write_vst_table(path: &Path, vst: &VstResult) -> Result<()> {
    write_matrix(path, "gene_id", &vst.gene_ids, &vst.sample_ids, vst.data.view())
}

#[derive(Debug, Serialize)]
struct SizeFactorRecord<'a> {
    sample: &'a str,
    group: &'a str,
    /// Estimated over all samples for the transform
    all_samples: f64,
    /// Estimated within the sample's cell line for testing
    within_line: Option<f64>,
}

/// Size factors per sample. `within_line` lists (sample, factor) pairs from
/// the per-line fits.
pub fn write_size_factors(
    path: &Path,
    vst: &VstResult,
    groups: &[String],
    within_line: &[(String, f64)],
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for (i, sample) in vst.sample_ids.iter().enumerate() {
        writer.serialize(SizeFactorRecord {
            sample,
            group: groups.get(i).map(String::as_str).unwrap_or(""),
            all_samples: vst.size_factors[i],
            within_line: within_line.iter().find(|(s, _)| s == sample).map(|&(_, f)| f),
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotatedRow;
    use crate::dispersion::DispersionTrend;
    use crate::engine::Contrast;
    use ndarray::{array, Array1};
    use tempfile::tempdir;

    #[test]
    fn test_de_table_columns_and_missing_values() {
        let results = AnnotatedResults {
            contrast: Contrast::new("condition", "treated", "control"),
            rows: vec![AnnotatedRow {
                gene_id: "ENSG1".to_string(),
                symbol: Some("MYC".to_string()),
                gene_name: None,
                entrez_id: Some("4609".to_string()),
                base_mean: 12.5,
                log2_fold_change: Some(3.0),
                lfc_se: Some(0.5),
                stat: Some(6.0),
                pvalue: Some(1e-9),
                padj: None,
                significant: false,
            }],
            n_duplicates: 0,
            n_unannotated: 0,
        };
        let dir = tempdir().unwrap();
        let path = dir.path().join("de.csv");
        write_de_table(&path, &results).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "gene_id,symbol,gene_name,entrez_id,baseMean,log2FoldChange,lfcSE,stat,pvalue,padj,significant"
        );
        assert_eq!(lines.next().unwrap(), "ENSG1,MYC,,4609,12.5,3.0,0.5,6.0,1e-9,,false");
    }

    #[test]
    fn test_empty_enrichment_table_has_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("enrichment.csv");
        write_enrichment_table(&path, &EnrichmentResult::default()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("ID,Description,GeneRatio"));
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_size_factors_table() {
        let vst = VstResult {
            data: array![[1.0, 2.0]],
            gene_ids: vec!["G1".to_string()],
            sample_ids: vec!["S1".to_string(), "S2".to_string()],
            size_factors: Array1::from_vec(vec![0.8, 1.25]),
            trend: DispersionTrend::Mean(0.1),
        };
        let dir = tempdir().unwrap();
        let path = dir.path().join("sf.csv");
        let groups = vec!["HT55 control".to_string(), "HT55 treated".to_string()];
        write_size_factors(&path, &vst, &groups, &[("S2".to_string(), 1.1)]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "sample,group,all_samples,within_line");
        assert_eq!(lines[1], "S1,HT55 control,0.8,");
        assert_eq!(lines[2], "S2,HT55 treated,1.25,1.1");
    }
}
