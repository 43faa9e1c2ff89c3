//! report.html assembly

use std::fmt::Write as FmtWrite;

use super::{Figure, ReportContent, ReportFigures, RenderParams, TableFile};
use crate::annotation::AnnotatedRow;
use crate::engine::{LFC_THRESHOLD, PADJ_THRESHOLD};
use crate::error::Result;

/// Escape text for HTML element content and attribute values
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn number(value: Option<f64>) -> String {
    match value {
        None => "NA".to_string(),
        Some(v) if v != 0.0 && (v.abs() < 1e-3 || v.abs() >= 1e5) => format!("{:.3e}", v),
        Some(v) => format!("{:.3}", v),
    }
}

/// HTML table of ranked result rows
pub fn ranked_table(rows: &[AnnotatedRow]) -> Result<String> {
    let mut html = String::new();
    writeln!(html, "<table class=\"table\">")?;
    writeln!(
        html,
        "<tr><th>gene_id</th><th>symbol</th><th>gene_name</th><th>baseMean</th><th>log2FoldChange</th>\
         <th>lfcSE</th><th>stat</th><th>pvalue</th><th>padj</th><th>significant</th></tr>"
    )?;
    for row in rows {
        writeln!(
            html,
            "<tr{}><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            if row.significant { " class=\"sig\"" } else { "" },
            escape(&row.gene_id),
            escape(row.symbol.as_deref().unwrap_or("")),
            escape(row.gene_name.as_deref().unwrap_or("")),
            number(Some(row.base_mean)),
            number(row.log2_fold_change),
            number(row.lfc_se),
            number(row.stat),
            number(row.pvalue),
            number(row.padj),
            if row.significant { "yes" } else { "no" },
        )?;
    }
    writeln!(html, "</table>")?;
    Ok(html)
}

fn write_figure(html: &mut String, figure: &Figure) -> Result<()> {
    writeln!(html, "<figure>")?;
    if let Some(reason) = figure.unavailable_reason() {
        writeln!(
            html,
            "<p class=\"unavailable\">Artifact unavailable: {}</p>",
            escape(reason)
        )?;
    }
    if !matches!(figure.status, super::FigureStatus::Missing { .. }) {
        writeln!(
            html,
            "<img src=\"{}\" alt=\"{}\"/>",
            escape(&figure.file),
            escape(&figure.title)
        )?;
    }
    writeln!(html, "<figcaption>{}</figcaption>", escape(&figure.title))?;
    writeln!(html, "</figure>")?;
    Ok(())
}

fn write_head(html: &mut String) -> Result<()> {
    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html lang=\"en\">")?;
    writeln!(html, "<head>")?;
    writeln!(html, "<meta charset=\"utf-8\"/>")?;
    writeln!(html, "<title>Differential expression report</title>")?;
    writeln!(html, "<style>")?;
    writeln!(html, "body{{font-family:Arial,Helvetica,sans-serif;margin:20px;color:#222;}}")?;
    writeln!(html, "h1{{font-size:24px;}} h2{{margin-top:32px;font-size:20px;}} h3{{font-size:16px;}}")?;
    writeln!(html, ".meta{{color:#555;font-size:13px;}}")?;
    writeln!(html, ".table{{border-collapse:collapse;font-size:12px;margin:8px 0 16px 0;}}")?;
    writeln!(html, ".table th,.table td{{border:1px solid #ddd;padding:4px 6px;text-align:right;}}")?;
    writeln!(html, ".table td:nth-child(-n+3),.table th:nth-child(-n+3){{text-align:left;}}")?;
    writeln!(html, ".sig{{background:#fdecea;}}")?;
    writeln!(html, ".unavailable{{color:#c00000;font-weight:bold;}}")?;
    writeln!(html, "figure{{margin:8px 0 24px 0;}} img{{max-width:100%;border:1px solid #e5e5e5;}}")?;
    writeln!(html, "</style>")?;
    writeln!(html, "</head>")?;
    Ok(())
}

/// Sections in fixed order: box plot, PCA, ranked tables, volcano plots,
/// heatmaps, overlap, dot plots, DAG plots
pub(super) fn build_document(
    content: &ReportContent,
    figures: &ReportFigures,
    tables: &[TableFile],
    params: &RenderParams,
) -> Result<String> {
    let mut html = String::with_capacity(64 * 1024);
    write_head(&mut html)?;
    writeln!(html, "<body>")?;
    writeln!(html, "<h1>Differential expression: {}</h1>", escape(&content.contrast.to_string()))?;
    writeln!(
        html,
        "<p class=\"meta\">{} genes, {} samples, {} unmapped transcript records. \
         Significant: padj &lt; {} and |log2FoldChange| &gt; {}.</p>",
        content.n_genes,
        content.n_samples,
        content.assembly.total_unmapped(),
        PADJ_THRESHOLD,
        LFC_THRESHOLD
    )?;
    if let Ok(qc) = &content.qc {
        let flagged = qc.qc.flagged_samples();
        if !flagged.is_empty() {
            writeln!(
                html,
                "<p class=\"unavailable\">Samples with an outlying median: {}</p>",
                escape(&flagged.join(", "))
            )?;
        }
    }

    writeln!(html, "<h2>Sample distributions</h2>")?;
    write_figure(&mut html, &figures.boxplot)?;

    writeln!(html, "<h2>PCA</h2>")?;
    write_figure(&mut html, &figures.pca)?;

    writeln!(html, "<h2>Top genes</h2>")?;
    for line in &content.lines {
        writeln!(html, "<h3>{}</h3>", escape(&line.cell_line))?;
        match &line.section {
            Ok(s) => {
                writeln!(
                    html,
                    "<p class=\"meta\">{} of {} genes significant ({} up, {} down); dispersion trend {}.</p>",
                    s.de_summary.significant,
                    s.de_summary.total_genes,
                    s.de_summary.upregulated,
                    s.de_summary.downregulated,
                    escape(&s.dispersion_trend)
                )?;
                html.push_str(&ranked_table(s.results.top(params.table_rows))?);
            }
            Err(e) => writeln!(html, "<p class=\"unavailable\">Artifact unavailable: {}</p>", escape(e))?,
        }
    }

    writeln!(html, "<h2>Volcano plots</h2>")?;
    for line in &figures.lines {
        write_figure(&mut html, &line.volcano)?;
    }

    writeln!(html, "<h2>Heatmaps</h2>")?;
    for line in &figures.lines {
        write_figure(&mut html, &line.heatmap)?;
    }

    writeln!(html, "<h2>Overlap</h2>")?;
    write_figure(&mut html, &figures.venn)?;

    writeln!(html, "<h2>GO enrichment</h2>")?;
    for line in &figures.lines {
        write_figure(&mut html, &line.dotplot)?;
    }

    writeln!(html, "<h2>Category DAGs</h2>")?;
    for line in &figures.lines {
        write_figure(&mut html, &line.dag)?;
    }

    writeln!(html, "<h2>Tables</h2>")?;
    writeln!(html, "<ul>")?;
    for table in tables {
        match &table.error {
            None => writeln!(html, "<li><a href=\"{0}\">{0}</a></li>", escape(&table.file))?,
            Some(e) => writeln!(
                html,
                "<li>{}: <span class=\"unavailable\">Artifact unavailable: {}</span></li>",
                escape(&table.file),
                escape(e)
            )?,
        }
    }
    writeln!(html, "<li><a href=\"summary.json\">summary.json</a></li>")?;
    writeln!(html, "</ul>")?;

    writeln!(html, "</body>")?;
    writeln!(html, "</html>")?;
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn test_number_format() {
        assert_eq!(number(None), "NA");
        assert_eq!(number(Some(0.0)), "0.000");
        assert_eq!(number(Some(2.5)), "2.500");
        assert_eq!(number(Some(1.5e-8)), "1.500e-8");
    }

    #[test]
    fn test_ranked_table_marks_significant() {
        let row = AnnotatedRow {
            gene_id: "ENSG1".to_string(),
            symbol: Some("MYC".to_string()),
            gene_name: Some("MYC <proto-oncogene>".to_string()),
            entrez_id: None,
            base_mean: 10.0,
            log2_fold_change: Some(3.0),
            lfc_se: Some(0.4),
            stat: Some(7.5),
            pvalue: Some(1e-12),
            padj: Some(1e-10),
            significant: true,
        };
        let table = ranked_table(&[row]).unwrap();
        assert!(table.contains("<tr class=\"sig\">"));
        assert!(table.contains("MYC &lt;proto-oncogene&gt;"));
        assert!(table.contains("1.000e-10"));
    }
}
