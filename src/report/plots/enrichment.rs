//! Enrichment dot plot

use std::path::Path;

use plotters::coord::ranged1d::SegmentValue;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::{centered, padj_color, truncate, PlotResult, FONT};
use crate::enrichment::EnrichmentResult;

/// Categories shown in a dot plot
pub const MAX_CATEGORIES: usize = 10;

fn dot_radius(count: usize, lo: usize, hi: usize) -> i32 {
    if hi > lo {
        4 + (12.0 * (count - lo) as f64 / (hi - lo) as f64).round() as i32
    } else {
        10
    }
}

/// Gene ratio on x, one row per category (best at the top), point size by
/// gene count and color by adjusted p-value
pub fn render_dotplot(path: &Path, title: &str, result: &EnrichmentResult) -> PlotResult {
    let rows = &result.rows[..result.rows.len().min(MAX_CATEGORIES)];
    if rows.is_empty() {
        return Err("no enriched categories".into());
    }

    let x_max = rows.iter().map(|r| r.ratio).fold(0.0, f64::max) * 1.15;
    let (c_lo, c_hi) = rows
        .iter()
        .fold((usize::MAX, 0), |(lo, hi), r| (lo.min(r.count), hi.max(r.count)));
    let (p_lo, p_hi) = rows
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| (lo.min(r.p_adjust), hi.max(r.p_adjust)));

    let n = rows.len();
    let root = SVGBackend::new(path, (1100, 160 + 50 * n as u32)).into_drawing_area();
    root.fill(&WHITE)?;
    let (plot, legend) = root.split_horizontally(920);

    let mut chart = ChartBuilder::on(&plot)
        .caption(title, (FONT, 24))
        .x_label_area_size(50)
        .y_label_area_size(340)
        .margin(20)
        .build_cartesian_2d(0.0..x_max.max(1e-3), (0..n).into_segmented())?;

    let description = |v: &SegmentValue<usize>| match v {
        SegmentValue::CenterOf(i) if *i < n => truncate(&rows[n - 1 - i].description, 48),
        _ => String::new(),
    };
    chart
        .configure_mesh()
        .y_labels(n)
        .y_label_formatter(&description)
        .x_desc("GeneRatio")
        .draw()?;

    chart.draw_series(rows.iter().enumerate().map(|(i, r)| {
        Circle::new(
            (r.ratio, SegmentValue::CenterOf(n - 1 - i)),
            dot_radius(r.count, c_lo, c_hi),
            padj_color(r.p_adjust, p_lo, p_hi).filled(),
        )
    }))?;

    let left = (FONT, 13).into_font().color(&BLACK).pos(Pos::new(HPos::Left, VPos::Center));
    legend.draw(&Text::new("p.adjust".to_string(), (60, 50), centered(15, &BLACK)))?;
    for step in 0..20 {
        let y = 66 + step * 5;
        let t = 1.0 - step as f64 / 19.0;
        legend.draw(&Rectangle::new([(20, y), (38, y + 5)], super::diverging(t).filled()))?;
    }
    legend.draw(&Text::new(format!("{:.1e}", p_lo), (44, 68), left.clone()))?;
    legend.draw(&Text::new(format!("{:.1e}", p_hi), (44, 164), left.clone()))?;

    legend.draw(&Text::new("Count".to_string(), (60, 200), centered(15, &BLACK)))?;
    let sizes = if c_hi > c_lo { vec![c_lo, c_hi] } else { vec![c_lo] };
    for (k, count) in sizes.into_iter().enumerate() {
        let y = 230 + k as i32 * 40;
        legend.draw(&Circle::new((30, y), dot_radius(count, c_lo, c_hi), RGBColor(90, 90, 90).filled()))?;
        legend.draw(&Text::new(count.to_string(), (54, y), left.clone()))?;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::EnrichmentRow;
    use tempfile::tempdir;

    fn row(id: &str, description: &str, count: usize, p_adjust: f64) -> EnrichmentRow {
        EnrichmentRow {
            id: id.to_string(),
            description: description.to_string(),
            gene_ratio: format!("{}/40", count),
            bg_ratio: "100/10000".to_string(),
            pvalue: p_adjust / 10.0,
            p_adjust,
            qvalue: p_adjust,
            gene_labels: "MYC/TP53".to_string(),
            count,
            ratio: count as f64 / 40.0,
        }
    }

    #[test]
    fn test_dotplot_renders_categories() {
        let result = EnrichmentResult {
            rows: vec![
                row("GO:0006915", "apoptotic process", 12, 1e-6),
                row("GO:0008283", "cell population proliferation", 8, 1e-3),
                row("GO:0007049", "cell cycle", 5, 0.04),
            ],
            warning: None,
            n_query: 40,
            n_universe: 10000,
        };
        let dir = tempdir().unwrap();
        let path = dir.path().join("dotplot.svg");
        render_dotplot(&path, "HT55 GO biological process", &result).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("apoptotic process"));
        assert!(svg.contains("GeneRatio"));
    }

    #[test]
    fn test_dotplot_empty_is_error() {
        let dir = tempdir().unwrap();
        assert!(render_dotplot(&dir.path().join("d.svg"), "empty", &EnrichmentResult::default()).is_err());
    }

    #[test]
    fn test_dot_radius_scale() {
        assert_eq!(dot_radius(5, 5, 5), 10);
        assert_eq!(dot_radius(5, 5, 15), 4);
        assert_eq!(dot_radius(15, 5, 15), 16);
    }
}
