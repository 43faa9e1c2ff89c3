//! summary.json: counts per stage

use serde::Serialize;

use super::{Figure, ReportContent, ReportFigures, TableFile};
use crate::annotation::OverlapCounts;
use crate::data::SampleAssembly;
use crate::engine::ResultsSummary;

#[derive(Debug, Clone, Serialize)]
pub struct LineSummary {
    pub cell_line: String,
    /// Set when the branch failed
    pub error: Option<String>,
    pub de: Option<ResultsSummary>,
    pub dispersion_trend: Option<String>,
    pub blind_dispersions: bool,
    pub duplicate_annotations: usize,
    pub unannotated_genes: usize,
    pub enrichment_query_genes: usize,
    pub enrichment_universe: usize,
    pub enrichment_dropped_genes: usize,
    pub enriched_categories: usize,
    pub enrichment_warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub contrast: String,
    pub n_genes: usize,
    pub n_samples: usize,
    pub assembly: Vec<SampleAssembly>,
    pub ignored_quant_dirs: Vec<String>,
    pub qc_error: Option<String>,
    pub flagged_samples: Vec<String>,
    pub pca_percent_var: Option<[f64; 2]>,
    pub lines: Vec<LineSummary>,
    pub overlap: Option<OverlapCounts>,
    pub figures: Vec<Figure>,
    pub tables: Vec<TableFile>,
}

impl RunSummary {
    pub fn new(content: &ReportContent, figures: &ReportFigures, tables: &[TableFile]) -> Self {
        let (qc_error, flagged_samples, pca_percent_var) = match &content.qc {
            Ok(q) => (
                None,
                q.qc.flagged_samples().into_iter().map(str::to_string).collect(),
                Some(q.qc.pca.percent_var),
            ),
            Err(e) => (Some(e.clone()), Vec::new(), None),
        };

        let lines = content
            .lines
            .iter()
            .map(|line| match &line.section {
                Ok(s) => LineSummary {
                    cell_line: line.cell_line.clone(),
                    error: None,
                    de: Some(s.de_summary.clone()),
                    dispersion_trend: Some(s.dispersion_trend.clone()),
                    blind_dispersions: s.blind_dispersions,
                    duplicate_annotations: s.results.n_duplicates,
                    unannotated_genes: s.results.n_unannotated,
                    enrichment_query_genes: s.enrichment.n_query,
                    enrichment_universe: s.enrichment.n_universe,
                    enrichment_dropped_genes: s.n_dropped,
                    enriched_categories: s.enrichment.rows.len(),
                    enrichment_warning: s.enrichment.warning.map(|w| w.to_string()),
                },
                Err(e) => LineSummary {
                    cell_line: line.cell_line.clone(),
                    error: Some(e.clone()),
                    de: None,
                    dispersion_trend: None,
                    blind_dispersions: false,
                    duplicate_annotations: 0,
                    unannotated_genes: 0,
                    enrichment_query_genes: 0,
                    enrichment_universe: 0,
                    enrichment_dropped_genes: 0,
                    enriched_categories: 0,
                    enrichment_warning: None,
                },
            })
            .collect();

        Self {
            contrast: content.contrast.to_string(),
            n_genes: content.n_genes,
            n_samples: content.n_samples,
            assembly: content.assembly.samples.clone(),
            ignored_quant_dirs: content.assembly.ignored_dirs.clone(),
            qc_error,
            flagged_samples,
            pca_percent_var,
            lines,
            overlap: content.overlap.as_ref().ok().cloned(),
            figures: figures.iter().cloned().collect(),
            tables: tables.to_vec(),
        }
    }
}
