//! Static HTML report: SVG figures, CSV tables and a JSON run summary
//!
//! Every artifact is rendered independently. A figure whose input is empty
//! or whose drawing fails is replaced by a placeholder and flagged as
//! unavailable in the document; the rest of the report is unaffected.

mod html;
pub mod plots;
mod summary;
mod tables;

pub use html::{escape, ranked_table};
pub use summary::{LineSummary, RunSummary};
pub use tables::{write_de_table, write_enrichment_table, write_size_factors, write_vst_table};

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::annotation::{AnnotatedResults, OverlapCounts};
use crate::data::AssemblyReport;
use crate::engine::{Contrast, ResultsSummary};
use crate::enrichment::{CategoryDag, EnrichmentResult};
use crate::error::{ReportError, Result};
use crate::qc::QcSummary;
use crate::transform::VstResult;
use plots::PlotResult;

/// Outcome of a stage that may fail without aborting the run; the error is
/// kept as its message for display
pub type Section<T> = std::result::Result<T, String>;

/// Normalization and QC outputs over all samples
#[derive(Debug, Clone)]
pub struct QcSection {
    pub vst: VstResult,
    pub qc: QcSummary,
    /// "<cell line> <condition>" per sample, in matrix order
    pub column_groups: Vec<String>,
}

/// Everything computed for one cell line
#[derive(Debug, Clone)]
pub struct LineSection {
    pub results: AnnotatedResults,
    pub de_summary: ResultsSummary,
    pub size_factors: Vec<(String, f64)>,
    pub dispersion_trend: String,
    /// Dispersions were estimated without the design (no replicates)
    pub blind_dispersions: bool,
    pub enrichment: EnrichmentResult,
    /// Significant genes without an Entrez identifier
    pub n_dropped: usize,
    pub dag: CategoryDag,
}

#[derive(Debug, Clone)]
pub struct LineReport {
    pub cell_line: String,
    pub section: Section<LineSection>,
}

/// Inputs of the report in pipeline order
#[derive(Debug, Clone)]
pub struct ReportContent {
    pub contrast: Contrast,
    pub assembly: AssemblyReport,
    pub n_genes: usize,
    pub n_samples: usize,
    pub qc: Section<QcSection>,
    pub lines: Vec<LineReport>,
    pub overlap: Section<OverlapCounts>,
}

/// Display settings
#[derive(Debug, Clone)]
pub struct RenderParams {
    /// Genes labelled on volcano plots and shown in heatmaps
    pub top_n: usize,
    /// Rows of the ranked tables in the document
    pub table_rows: usize,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            top_n: 10,
            table_rows: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FigureStatus {
    Rendered,
    /// A placeholder image stands in for the figure
    Placeholder { reason: String },
    /// Not even the placeholder could be written
    Missing { reason: String },
}

/// One SVG file of the report
#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    pub title: String,
    /// Relative to the output directory
    pub file: String,
    #[serde(flatten)]
    pub status: FigureStatus,
}

impl Figure {
    pub fn is_rendered(&self) -> bool {
        self.status == FigureStatus::Rendered
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.status {
            FigureStatus::Rendered => None,
            FigureStatus::Placeholder { reason } | FigureStatus::Missing { reason } => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LineFigures {
    pub cell_line: String,
    pub volcano: Figure,
    pub heatmap: Figure,
    pub dotplot: Figure,
    pub dag: Figure,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportFigures {
    pub boxplot: Figure,
    pub pca: Figure,
    pub lines: Vec<LineFigures>,
    pub venn: Figure,
}

impl ReportFigures {
    pub fn iter(&self) -> impl Iterator<Item = &Figure> {
        [&self.boxplot, &self.pca]
            .into_iter()
            .chain(self.lines.iter().flat_map(|l| [&l.volcano, &l.heatmap, &l.dotplot, &l.dag]))
            .chain(std::iter::once(&self.venn))
    }
}

/// A CSV table and whether it was written
#[derive(Debug, Clone, Serialize)]
pub struct TableFile {
    pub file: String,
    pub error: Option<String>,
}

/// Paths of everything written for one run
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub html: PathBuf,
    pub summary: PathBuf,
    pub figures: ReportFigures,
    pub tables: Vec<TableFile>,
}

/// Lowercase file-name stem for a cell line label
pub fn file_stem(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// Draw one figure, falling back to a placeholder on any failure
fn figure<F>(out_dir: &Path, file: String, title: String, draw: F) -> Figure
where
    F: FnOnce(&Path) -> PlotResult,
{
    let path = out_dir.join(&file);
    let status = match draw(&path) {
        Ok(()) => FigureStatus::Rendered,
        Err(e) => {
            let err = ReportError::Render {
                artifact: file.clone(),
                reason: e.to_string(),
            };
            log::warn!("{}", err);
            let reason = e.to_string();
            match plots::render_placeholder(&path, &title, &reason) {
                Ok(()) => FigureStatus::Placeholder { reason },
                Err(e) => {
                    log::warn!("Placeholder for {} failed: {}", file, e);
                    FigureStatus::Missing { reason }
                }
            }
        }
    };
    Figure { title, file, status }
}

fn unavailable(reason: &str) -> PlotResult {
    Err(reason.to_string().into())
}

fn render_line_figures(out_dir: &Path, line: &LineReport, qc: &Section<QcSection>, params: &RenderParams) -> LineFigures {
    let stem = file_stem(&line.cell_line);
    let name = &line.cell_line;
    let section = line.section.as_ref();

    let volcano = figure(out_dir, format!("volcano_{}.svg", stem), format!("{}: volcano plot", name), |p| {
        match section {
            Ok(s) => plots::render_volcano(p, &format!("{}: {}", name, s.results.contrast), &s.results, params.top_n),
            Err(e) => unavailable(e),
        }
    });

    let heatmap = figure(out_dir, format!("heatmap_{}.svg", stem), format!("{}: top {} genes", name, params.top_n), |p| {
        match (section, qc.as_ref()) {
            (Ok(s), Ok(q)) => plots::render_heatmap(
                p,
                &format!("{}: top {} genes by padj", name, params.top_n),
                &q.vst,
                &s.results.labelled(params.top_n),
                &q.column_groups,
            ),
            (Err(e), _) | (_, Err(e)) => unavailable(e),
        }
    });

    let dotplot = figure(out_dir, format!("dotplot_{}.svg", stem), format!("{}: GO enrichment", name), |p| match section {
        Ok(s) if s.enrichment.is_empty() => unavailable(
            &s.enrichment
                .warning
                .map(|w| w.to_string())
                .unwrap_or_else(|| "no enriched categories".to_string()),
        ),
        Ok(s) => plots::render_dotplot(p, &format!("{}: GO biological process", name), &s.enrichment),
        Err(e) => unavailable(e),
    });

    let dag = figure(out_dir, format!("dag_{}.svg", stem), format!("{}: category DAG", name), |p| match section {
        Ok(s) => plots::render_dag(p, &format!("{}: top categories and ancestors", name), &s.dag),
        Err(e) => unavailable(e),
    });

    LineFigures {
        cell_line: line.cell_line.clone(),
        volcano,
        heatmap,
        dotplot,
        dag,
    }
}

fn write_tables(out_dir: &Path, content: &ReportContent) -> Vec<TableFile> {
    let mut tables = Vec::new();
    let mut record = |file: String, written: Result<()>| {
        let error = written.err().map(|e| {
            log::warn!("Writing {} failed: {}", file, e);
            e.to_string()
        });
        tables.push(TableFile { file, error });
    };

    for line in &content.lines {
        let stem = file_stem(&line.cell_line);
        if let Ok(s) = &line.section {
            let file = format!("de_{}.csv", stem);
            record(file.clone(), write_de_table(&out_dir.join(&file), &s.results));
            let file = format!("enrichment_{}.csv", stem);
            record(file.clone(), write_enrichment_table(&out_dir.join(&file), &s.enrichment));
        }
    }

    if let Ok(q) = &content.qc {
        record("vst.csv".to_string(), write_vst_table(&out_dir.join("vst.csv"), &q.vst));
        let within_line: Vec<(String, f64)> = content
            .lines
            .iter()
            .filter_map(|l| l.section.as_ref().ok())
            .flat_map(|s| s.size_factors.iter().cloned())
            .collect();
        record(
            "size_factors.csv".to_string(),
            write_size_factors(&out_dir.join("size_factors.csv"), &q.vst, &q.column_groups, &within_line),
        );
    }
    tables
}

/// Write every figure, table, the summary and `report.html` into `out_dir`.
///
/// Only failures to create the directory or to write the document itself
/// are returned as errors.
pub fn render_report(out_dir: &Path, content: &ReportContent, params: &RenderParams) -> Result<RenderedReport> {
    fs::create_dir_all(out_dir)?;

    let qc = content.qc.as_ref();
    let boxplot = figure(out_dir, "boxplot.svg".to_string(), "Sample distributions".to_string(), |p| match qc {
        Ok(q) => plots::render_boxplot(p, &q.qc.box_stats),
        Err(e) => unavailable(e),
    });
    let pca = figure(out_dir, "pca.svg".to_string(), "PCA".to_string(), |p| match qc {
        Ok(q) => plots::render_pca(p, &q.qc.pca),
        Err(e) => unavailable(e),
    });
    let lines = content
        .lines
        .iter()
        .map(|line| render_line_figures(out_dir, line, &content.qc, params))
        .collect();
    let venn = figure(out_dir, "overlap.svg".to_string(), "Overlap of significant genes".to_string(), |p| {
        match &content.overlap {
            Ok(counts) => plots::render_venn(p, counts),
            Err(e) => unavailable(e),
        }
    });
    let figures = ReportFigures {
        boxplot,
        pca,
        lines,
        venn,
    };

    let tables = write_tables(out_dir, content);

    let summary = RunSummary::new(content, &figures, &tables);
    let summary_path = out_dir.join("summary.json");
    let file = fs::File::create(&summary_path)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), &summary)?;

    let document = html::build_document(content, &figures, &tables, params)?;
    let html_path = out_dir.join("report.html");
    fs::write(&html_path, document)?;

    let n_missing = figures.iter().filter(|f| !f.is_rendered()).count();
    log::info!(
        "Report written to {} ({} figures, {} unavailable)",
        html_path.display(),
        figures.iter().count(),
        n_missing
    );

    Ok(RenderedReport {
        html: html_path,
        summary: summary_path,
        figures,
        tables,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn failed_content() -> ReportContent {
        ReportContent {
            contrast: Contrast::new("condition", "treated", "control"),
            assembly: AssemblyReport::default(),
            n_genes: 0,
            n_samples: 0,
            qc: Err("trend fitting failed".to_string()),
            lines: vec![
                LineReport {
                    cell_line: "HT55".to_string(),
                    section: Err("design has no residual degrees of freedom".to_string()),
                },
                LineReport {
                    cell_line: "SW948".to_string(),
                    section: Err("no samples".to_string()),
                },
            ],
            overlap: Err("requires two completed cell lines".to_string()),
        }
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("HT55"), "ht55");
        assert_eq!(file_stem("SW 948/b"), "sw_948_b");
    }

    #[test]
    fn test_failed_sections_become_placeholders() {
        let dir = tempdir().unwrap();
        let rendered = render_report(dir.path(), &failed_content(), &RenderParams::default()).unwrap();

        assert!(rendered.figures.iter().all(|f| !f.is_rendered()));
        assert_eq!(rendered.figures.iter().count(), 11);
        assert!(dir.path().join("volcano_ht55.svg").exists());
        assert!(dir.path().join("dag_sw948.svg").exists());
        assert!(rendered.tables.is_empty());

        let html = fs::read_to_string(&rendered.html).unwrap();
        assert!(html.contains("Artifact unavailable: design has no residual degrees of freedom"));
        let order = [
            "<h2>Sample distributions</h2>",
            "<h2>PCA</h2>",
            "<h2>Top genes</h2>",
            "<h2>Volcano plots</h2>",
            "<h2>Heatmaps</h2>",
            "<h2>Overlap</h2>",
            "<h2>GO enrichment</h2>",
            "<h2>Category DAGs</h2>",
        ];
        let positions: Vec<usize> = order.iter().map(|h| html.find(h).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&rendered.summary).unwrap()).unwrap();
        assert_eq!(summary["qc_error"], "trend fitting failed");
        assert_eq!(summary["figures"][0]["status"], "placeholder");
    }
}
