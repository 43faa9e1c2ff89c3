//! End-to-end report run: assemble counts, QC, per-cell-line testing,
//! annotation and enrichment, then rendering

use std::path::{Path, PathBuf};

use crate::annotation::{annotate, overlap, AnnotationSource, OverlapCounts, TsvAnnotationSource};
use crate::data::{assemble_counts, AssemblyReport, ExperimentDataset};
use crate::dispersion::DispersionParams;
use crate::engine::{Contrast, DifferentialExpressionEngine, NegativeBinomialEngine};
use crate::enrichment::{category_dag, EnrichmentEngine, EnrichmentParams, EnrichmentQuery, HypergeometricEnrichment, Ontology};
use crate::error::{ReportError, Result};
use crate::io::{read_metadata, read_tx2gene};
use crate::qc::run_qc;
use crate::report::{render_report, LineReport, LineSection, QcSection, RenderParams, RenderedReport, ReportContent, Section};
use crate::transform::vst;

/// Input files of a run
#[derive(Debug, Clone)]
pub struct ReportInputs {
    pub tx2gene: PathBuf,
    pub metadata: PathBuf,
    pub quant_dir: PathBuf,
    pub annotation: PathBuf,
    pub ontology: PathBuf,
    pub gene2go: PathBuf,
}

/// Run settings. Significance thresholds are fixed and not part of this.
#[derive(Debug, Clone)]
pub struct ReportParams {
    pub cell_line_column: String,
    pub condition_column: String,
    pub control: String,
    pub treated: String,
    /// Genes labelled on volcano plots and shown in heatmaps
    pub top_n: usize,
    /// Rows of the ranked tables
    pub table_rows: usize,
    /// Categories seeding each DAG plot
    pub dag_top: usize,
    /// Allowed distance of a sample median from the median of medians
    pub median_tolerance: f64,
    pub dispersion: DispersionParams,
    pub enrichment: EnrichmentParams,
}

impl Default for ReportParams {
    fn default() -> Self {
        Self {
            cell_line_column: "cell_line".to_string(),
            condition_column: "condition".to_string(),
            control: "control".to_string(),
            treated: "treated".to_string(),
            top_n: 10,
            table_rows: 6,
            dag_top: 5,
            median_tolerance: 1.0,
            dispersion: DispersionParams::default(),
            enrichment: EnrichmentParams::default(),
        }
    }
}

impl ReportParams {
    pub fn contrast(&self) -> Contrast {
        Contrast::new(&self.condition_column, &self.treated, &self.control)
    }

    fn render_params(&self) -> RenderParams {
        RenderParams {
            top_n: self.top_n,
            table_rows: self.table_rows,
        }
    }
}

/// Collaborators of the analysis stages
pub struct Engines<'a> {
    pub de: &'a dyn DifferentialExpressionEngine,
    pub annotation: &'a dyn AnnotationSource,
    pub enrichment: &'a dyn EnrichmentEngine,
    /// Ontology the DAG plots are drawn from
    pub ontology: &'a Ontology,
}

/// Keep input-integrity errors, turn anything else into a section message
fn soft<T>(stage: &str, result: Result<T>) -> Result<Section<T>> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(e) if e.is_input_integrity() => Err(e),
        Err(e) => {
            log::warn!("{} failed: {}", stage, e);
            Ok(Err(e.to_string()))
        }
    }
}

fn qc_section(dataset: &ExperimentDataset, params: &ReportParams) -> Result<QcSection> {
    let metadata = dataset.sample_metadata();
    let transformed = vst(dataset.counts(), &params.dispersion)?;
    let qc = run_qc(
        &transformed,
        metadata,
        &params.cell_line_column,
        &params.condition_column,
        params.median_tolerance,
    )?;
    for sample in qc.flagged_samples() {
        log::warn!("Sample {} has an outlying median", sample);
    }

    let column_groups = (0..metadata.n_samples())
        .map(|i| -> Result<String> {
            Ok(format!(
                "{} {}",
                metadata.get_value(&params.cell_line_column, i)?,
                metadata.get_value(&params.condition_column, i)?
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QcSection {
        vst: transformed,
        qc,
        column_groups,
    })
}

fn line_section(
    dataset: &ExperimentDataset,
    cell_line: &str,
    engines: &Engines<'_>,
    params: &ReportParams,
) -> Result<LineSection> {
    let subset = dataset.subset(&params.cell_line_column, cell_line)?;
    log::info!("{}: testing {} samples", cell_line, subset.n_samples());

    let de = engines.de.test(&subset, &params.contrast())?;
    let de_summary = de.summary();
    log::info!(
        "{}: {} significant ({} up, {} down) of {} tested",
        cell_line,
        de_summary.significant,
        de_summary.upregulated,
        de_summary.downregulated,
        de_summary.genes_tested
    );

    let results = annotate(&de, engines.annotation)?;
    let query = EnrichmentQuery::from_results(&results);
    let enrichment = engines.enrichment.enrich(&query)?;
    if let Some(warning) = enrichment.warning {
        log::warn!("{}: enrichment empty: {}", cell_line, warning);
    }
    let dag = category_dag(&enrichment, engines.ontology, params.dag_top);

    Ok(LineSection {
        size_factors: de.sample_ids.iter().cloned().zip(de.size_factors.iter().copied()).collect(),
        dispersion_trend: de.dispersion_trend.clone(),
        blind_dispersions: de.blind_dispersions,
        de_summary,
        results,
        enrichment,
        n_dropped: query.n_dropped,
        dag,
    })
}

fn overlap_section(lines: &[LineReport]) -> Section<OverlapCounts> {
    let done: Vec<(&str, &LineSection)> = lines
        .iter()
        .filter_map(|l| l.section.as_ref().ok().map(|s| (l.cell_line.as_str(), s)))
        .collect();
    match done.as_slice() {
        [(a, sa), (b, sb)] if lines.len() == 2 => {
            let counts = overlap(&sa.results, &sb.results, a, b);
            log::info!(
                "Overlap: {} only {}, {} only {}, {} both, {} neither",
                counts.only_a,
                a,
                counts.only_b,
                b,
                counts.both,
                counts.neither
            );
            Ok(counts)
        }
        _ => Err(format!(
            "needs two completed cell lines, {} of {} completed",
            done.len(),
            lines.len()
        )),
    }
}

/// Run every analysis stage on a bound dataset.
///
/// Input-integrity errors (bad design levels, missing samples, unusable
/// counts) are returned; any other failure is confined to its section (QC
/// or one cell line) and reported there.
pub fn analyze(
    dataset: &ExperimentDataset,
    assembly: AssemblyReport,
    engines: &Engines<'_>,
    params: &ReportParams,
) -> Result<ReportContent> {
    let metadata = dataset.sample_metadata();
    let cell_lines = metadata
        .levels(&params.cell_line_column)
        .ok_or_else(|| ReportError::InvalidMetadata {
            reason: format!("column '{}' not found", params.cell_line_column),
        })?;

    log::info!("Normalization and QC on {} samples", dataset.n_samples());
    let qc = soft("QC", qc_section(dataset, params))?;

    let mut lines = Vec::with_capacity(cell_lines.len());
    for cell_line in cell_lines {
        let section = soft(&cell_line, line_section(dataset, &cell_line, engines, params))?;
        lines.push(LineReport { cell_line, section });
    }
    let overlap = overlap_section(&lines);

    Ok(ReportContent {
        contrast: params.contrast(),
        assembly,
        n_genes: dataset.n_genes(),
        n_samples: dataset.n_samples(),
        qc,
        lines,
        overlap,
    })
}

/// Load every input, analyze and write the report into `out_dir`
pub fn run_report(inputs: &ReportInputs, out_dir: &Path, params: &ReportParams) -> Result<RenderedReport> {
    log::info!("Loading metadata from {}", inputs.metadata.display());
    let metadata = read_metadata(&inputs.metadata)?;
    for column in [&params.cell_line_column, &params.condition_column] {
        if !metadata.has_condition(column) {
            return Err(ReportError::InvalidMetadata {
                reason: format!("column '{}' not found", column),
            });
        }
    }

    log::info!("Loading transcript-to-gene map from {}", inputs.tx2gene.display());
    let tx2gene = read_tx2gene(&inputs.tx2gene)?;
    log::info!("Assembling counts from {}", inputs.quant_dir.display());
    let (counts, assembly) = assemble_counts(&inputs.quant_dir, &tx2gene, &metadata)?;
    log::info!(
        "  {} genes, {} samples, {} unmapped transcript records",
        counts.n_genes(),
        counts.n_samples(),
        assembly.total_unmapped()
    );
    let dataset = ExperimentDataset::new(counts, metadata, &params.condition_column)?;

    let annotation = TsvAnnotationSource::from_path(&inputs.annotation)?;
    log::info!("Loaded {} annotation records", annotation.len());
    let enrichment = HypergeometricEnrichment::from_files(&inputs.ontology, &inputs.gene2go, params.enrichment.clone())?;
    let de = NegativeBinomialEngine {
        dispersion: params.dispersion.clone(),
        ..Default::default()
    };
    let engines = Engines {
        de: &de,
        annotation: &annotation,
        enrichment: &enrichment,
        ontology: enrichment.ontology(),
    };

    let content = analyze(&dataset, assembly, &engines, params)?;
    render_report(out_dir, &content, &params.render_params())
}
