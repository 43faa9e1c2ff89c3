//! Volcano plot of one annotated result set

use std::path::Path;

use plotters::prelude::*;

use super::{padded_range, PlotResult, FONT, GREY, SIGNIFICANT};
use crate::annotation::AnnotatedResults;
use crate::engine::{LFC_THRESHOLD, PADJ_THRESHOLD};

fn neg_log10(p: f64) -> f64 {
    -p.max(1e-300).log10()
}

/// Points at (log2 fold change, -log10 padj); rows missing either value are
/// left out. The first `top_n` ranked genes with both values are labelled.
pub fn render_volcano(path: &Path, title: &str, results: &AnnotatedResults, top_n: usize) -> PlotResult {
    let points: Vec<(f64, f64, bool)> = results
        .rows
        .iter()
        .filter_map(|r| match (r.log2_fold_change, r.padj) {
            (Some(lfc), Some(padj)) if lfc.is_finite() => Some((lfc, neg_log10(padj), r.significant)),
            _ => None,
        })
        .collect();
    if points.is_empty() {
        return Err("no genes with a defined fold change and padj".into());
    }

    let x_max = points
        .iter()
        .map(|p| p.0.abs())
        .fold(LFC_THRESHOLD, f64::max)
        * 1.1;
    let (_, y_max) = padded_range(
        points.iter().map(|p| p.1).chain(std::iter::once(neg_log10(PADJ_THRESHOLD))),
        0.1,
    )
    .ok_or("no finite padj values")?;

    let root = SVGBackend::new(path, (900, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 28))
        .x_label_area_size(60)
        .y_label_area_size(70)
        .margin(20)
        .build_cartesian_2d(-x_max..x_max, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("log2 fold change")
        .y_desc("-log10 adjusted p-value")
        .draw()?;

    let guide = RGBColor(90, 90, 90).mix(0.6).stroke_width(1);
    let y_cut = neg_log10(PADJ_THRESHOLD);
    chart.draw_series(LineSeries::new(vec![(-x_max, y_cut), (x_max, y_cut)], guide))?;
    for x in [-LFC_THRESHOLD, LFC_THRESHOLD] {
        chart.draw_series(LineSeries::new(vec![(x, 0.0), (x, y_max)], guide))?;
    }

    let n_significant = points.iter().filter(|p| p.2).count();
    chart
        .draw_series(
            points
                .iter()
                .filter(|p| !p.2)
                .map(|&(x, y, _)| Circle::new((x, y), 3, GREY.mix(0.7).filled())),
        )?
        .label(format!("not significant (N={})", points.len() - n_significant))
        .legend(|(x, y)| Circle::new((x + 10, y), 4, GREY.filled()));
    chart
        .draw_series(
            points
                .iter()
                .filter(|p| p.2)
                .map(|&(x, y, _)| Circle::new((x, y), 4, SIGNIFICANT.filled())),
        )?
        .label(format!("significant (N={})", n_significant))
        .legend(|(x, y)| Circle::new((x + 10, y), 4, SIGNIFICANT.filled()));

    let labels = results
        .labelled(top_n)
        .into_iter()
        .filter_map(|r| Some((r.label().to_string(), r.log2_fold_change?, neg_log10(r.padj?))));
    chart.draw_series(labels.map(|(label, x, y)| {
        EmptyElement::at((x, y))
            + Circle::new((0, 0), 4, ShapeStyle::from(&BLACK).stroke_width(1))
            + Text::new(label, (6, -12), (FONT, 13).into_font().color(&BLACK))
    }))?;

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotatedRow;
    use crate::engine::Contrast;
    use tempfile::tempdir;

    fn row(id: &str, symbol: Option<&str>, lfc: Option<f64>, padj: Option<f64>) -> AnnotatedRow {
        AnnotatedRow {
            gene_id: id.to_string(),
            symbol: symbol.map(str::to_string),
            gene_name: None,
            entrez_id: None,
            base_mean: 100.0,
            log2_fold_change: lfc,
            lfc_se: None,
            stat: None,
            pvalue: padj,
            padj,
            significant: crate::engine::is_significant(padj, lfc),
        }
    }

    fn results(rows: Vec<AnnotatedRow>) -> AnnotatedResults {
        AnnotatedResults {
            contrast: Contrast::new("condition", "treated", "control"),
            rows,
            n_duplicates: 0,
            n_unannotated: 0,
        }
    }

    #[test]
    fn test_volcano_labels_top_genes() {
        let res = results(vec![
            row("ENSG1", Some("MYC"), Some(4.0), Some(0.0)),
            row("ENSG2", None, Some(-3.0), Some(1e-5)),
            row("ENSG3", Some("ACTB"), Some(0.1), Some(0.8)),
            row("ENSG4", Some("GAPDH"), None, None),
        ]);
        let dir = tempdir().unwrap();
        let path = dir.path().join("volcano.svg");
        render_volcano(&path, "HT55: treated vs control", &res, 2).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("MYC"));
        assert!(svg.contains("ENSG2"));
        assert!(!svg.contains("ACTB"));
        assert!(svg.contains("significant (N=2)"));
    }

    #[test]
    fn test_volcano_all_undefined_is_error() {
        let res = results(vec![row("ENSG1", None, None, None)]);
        let dir = tempdir().unwrap();
        assert!(render_volcano(&dir.path().join("v.svg"), "empty", &res, 10).is_err());
    }
}
