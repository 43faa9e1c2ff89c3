//! Sample distribution box plot and PCA scatter

use std::collections::BTreeMap;
use std::path::Path;

use plotters::coord::ranged1d::SegmentValue;
use plotters::prelude::*;

use super::{padded_range, palette, PlotResult, FONT, SIGNIFICANT};
use crate::qc::{BoxStats, PcaResult};

/// One box per sample: whiskers at min and max, box from q1 to q3 and a bar
/// at the median. Flagged samples are outlined in red.
pub fn render_boxplot(path: &Path, stats: &[BoxStats]) -> PlotResult {
    let range = padded_range(stats.iter().flat_map(|s| [s.min, s.max]), 0.05)
        .ok_or("no finite values to plot")?;
    let width = (160 + 60 * stats.len() as u32).max(640);
    let root = SVGBackend::new(path, (width, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Variance-stabilized counts per sample", (FONT, 28))
        .x_label_area_size(80)
        .y_label_area_size(70)
        .margin(20)
        .build_cartesian_2d((0..stats.len()).into_segmented(), range.0..range.1)?;

    let label = |v: &SegmentValue<usize>| match v {
        SegmentValue::CenterOf(i) => stats.get(*i).map(|s| s.sample_id.clone()).unwrap_or_default(),
        _ => String::new(),
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(stats.len())
        .x_label_formatter(&label)
        .x_desc("Sample")
        .y_desc("VST value")
        .draw()?;

    for (i, s) in stats.iter().enumerate() {
        if ![s.min, s.q1, s.median, s.q3, s.max].iter().all(|v| v.is_finite()) {
            continue;
        }
        let color = palette(0);
        let outline = if s.flagged { SIGNIFICANT } else { BLACK };

        chart.draw_series(
            [(s.min, s.q1), (s.q3, s.max)]
                .into_iter()
                .map(|(a, b)| PathElement::new(vec![(SegmentValue::CenterOf(i), a), (SegmentValue::CenterOf(i), b)], &BLACK)),
        )?;

        let mut body = Rectangle::new(
            [(SegmentValue::Exact(i), s.q1), (SegmentValue::Exact(i + 1), s.q3)],
            color.mix(0.4).filled(),
        );
        body.set_margin(0, 0, 10, 10);
        let mut frame = Rectangle::new(
            [(SegmentValue::Exact(i), s.q1), (SegmentValue::Exact(i + 1), s.q3)],
            ShapeStyle::from(&outline).stroke_width(if s.flagged { 3 } else { 1 }),
        );
        frame.set_margin(0, 0, 10, 10);
        chart.draw_series([body, frame])?;

        let mut median = Rectangle::new(
            [(SegmentValue::Exact(i), s.median), (SegmentValue::Exact(i + 1), s.median)],
            ShapeStyle::from(&BLACK).stroke_width(3),
        );
        median.set_margin(0, 0, 10, 10);
        chart.draw_series(std::iter::once(median))?;
    }

    root.present()?;
    Ok(())
}

/// PC1 against PC2, colored by cell line; treated samples are filled,
/// control samples hollow
pub fn render_pca(path: &Path, pca: &PcaResult) -> PlotResult {
    let x = padded_range(pca.points.iter().map(|p| p.pc1), 0.15).ok_or("no samples to plot")?;
    let y = padded_range(pca.points.iter().map(|p| p.pc2), 0.15).ok_or("no samples to plot")?;

    let root = SVGBackend::new(path, (900, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("PCA of variance-stabilized counts", (FONT, 28))
        .x_label_area_size(60)
        .y_label_area_size(70)
        .margin(20)
        .build_cartesian_2d(x.0..x.1, y.0..y.1)?;

    chart
        .configure_mesh()
        .x_desc(format!("PC1: {:.1}% variance", pca.percent_var[0]))
        .y_desc(format!("PC2: {:.1}% variance", pca.percent_var[1]))
        .draw()?;

    let mut lines: BTreeMap<&str, RGBColor> = BTreeMap::new();
    for p in &pca.points {
        let next = lines.len();
        lines.entry(p.cell_line.as_str()).or_insert_with(|| palette(next));
    }
    let conditions: Vec<&str> = {
        let mut c: Vec<&str> = pca.points.iter().map(|p| p.condition.as_str()).collect();
        c.sort_unstable();
        c.dedup();
        c
    };

    for (line, color) in &lines {
        for (k, condition) in conditions.iter().enumerate() {
            let group: Vec<_> = pca
                .points
                .iter()
                .filter(|p| p.cell_line == *line && p.condition == *condition)
                .collect();
            if group.is_empty() {
                continue;
            }
            let style = if k == 0 {
                ShapeStyle::from(color).stroke_width(2)
            } else {
                color.filled()
            };
            chart
                .draw_series(group.iter().map(|p| Circle::new((p.pc1, p.pc2), 7, style)))?
                .label(format!("{} {}", line, condition))
                .legend(move |(lx, ly)| Circle::new((lx + 10, ly), 5, style));
        }
    }

    chart.draw_series(pca.points.iter().map(|p| {
        Text::new(
            p.sample_id.clone(),
            (p.pc1, p.pc2),
            (FONT, 12).into_font().color(&BLACK),
        )
    }))?;

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qc::PcaPoint;
    use tempfile::tempdir;

    fn stats(id: &str, median: f64, flagged: bool) -> BoxStats {
        BoxStats {
            sample_id: id.to_string(),
            min: median - 3.0,
            q1: median - 1.0,
            median,
            q3: median + 1.0,
            max: median + 4.0,
            flagged,
        }
    }

    #[test]
    fn test_boxplot_renders() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("box.svg");
        render_boxplot(&path, &[stats("S1", 8.0, false), stats("S2", 8.2, false), stats("S3", 11.0, true)]).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("S3"));
    }

    #[test]
    fn test_boxplot_without_values_fails() {
        let dir = tempdir().unwrap();
        let mut s = stats("S1", f64::NAN, false);
        s.min = f64::NAN;
        s.max = f64::NAN;
        assert!(render_boxplot(&dir.path().join("box.svg"), &[s]).is_err());
    }

    #[test]
    fn test_pca_renders() {
        let point = |id: &str, line: &str, condition: &str, pc1: f64, pc2: f64| PcaPoint {
            sample_id: id.to_string(),
            pc1,
            pc2,
            cell_line: line.to_string(),
            condition: condition.to_string(),
        };
        let pca = PcaResult {
            points: vec![
                point("A1", "HT55", "control", -2.0, 1.0),
                point("A2", "HT55", "treated", -2.1, 0.8),
                point("B1", "SW948", "control", 2.0, -1.0),
                point("B2", "SW948", "treated", 3.0, 1.5),
            ],
            percent_var: [80.0, 15.0],
            n_genes_used: 4,
        };
        let dir = tempdir().unwrap();
        let path = dir.path().join("pca.svg");
        render_pca(&path, &pca).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("PC1: 80.0% variance"));
        assert!(svg.contains("SW948 treated"));
    }
}
