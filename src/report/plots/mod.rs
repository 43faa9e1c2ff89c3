//! SVG figures drawn with plotters
//!
//! Every renderer writes one SVG file and returns a boxed error on failure;
//! the caller decides whether to substitute a placeholder.

mod dag;
mod enrichment;
mod heatmap;
mod qc;
mod venn;
mod volcano;

pub use dag::render_dag;
pub use enrichment::render_dotplot;
pub use heatmap::render_heatmap;
pub use qc::{render_boxplot, render_pca};
pub use venn::render_venn;
pub use volcano::render_volcano;

use std::error::Error;
use std::path::Path;

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

pub type PlotResult = std::result::Result<(), Box<dyn Error + Send + Sync>>;

pub(crate) const FONT: &str = "sans-serif";
pub(crate) const GREY: RGBColor = RGBColor(170, 170, 170);
pub(crate) const SIGNIFICANT: RGBColor = RGBColor(200, 30, 45);
pub(crate) const PALETTE: [RGBColor; 6] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(23, 190, 207),
];

pub(crate) fn palette(i: usize) -> RGBColor {
    PALETTE[i % PALETTE.len()]
}

/// (min, max) of the finite values, padded by `pad` of the span
pub(crate) fn padded_range<I: IntoIterator<Item = f64>>(values: I, pad: f64) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return None;
    }
    let span = if hi > lo { hi - lo } else { 1.0 };
    Some((lo - pad * span, hi + pad * span))
}

/// Text style centred on its anchor point
pub(crate) fn centered(size: u32, color: &RGBColor) -> TextStyle<'_> {
    (FONT, size)
        .into_font()
        .color(color)
        .pos(Pos::new(HPos::Center, VPos::Center))
}

/// Blue (t = 0) to white to red (t = 1)
pub(crate) fn diverging(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 };
    let lerp = |a: f64, b: f64, s: f64| (a + (b - a) * s).round() as u8;
    if t < 0.5 {
        let s = t / 0.5;
        RGBColor(lerp(49.0, 255.0, s), lerp(54.0, 255.0, s), lerp(149.0, 255.0, s))
    } else {
        let s = (t - 0.5) / 0.5;
        RGBColor(lerp(255.0, 215.0, s), lerp(255.0, 48.0, s), lerp(255.0, 39.0, s))
    }
}

/// Red for small adjusted p-values fading to blue for values near the cutoff
pub(crate) fn padj_color(padj: f64, lo: f64, hi: f64) -> RGBColor {
    if !(hi > lo) {
        return diverging(1.0);
    }
    let (l, h, v) = (lo.max(1e-300).log10(), hi.max(1e-300).log10(), padj.max(1e-300).log10());
    diverging(1.0 - (v - l) / (h - l))
}

/// Shorten `label` to `max` characters with a trailing ellipsis
pub(crate) fn truncate(label: &str, max: usize) -> String {
    if label.chars().count() <= max {
        label.to_string()
    } else {
        let head: String = label.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}

/// Framed box with a title and a message, used in place of a figure that
/// has no data or failed to render
pub fn render_placeholder(path: &Path, title: &str, message: &str) -> PlotResult {
    let root = SVGBackend::new(path, (800, 300)).into_drawing_area();
    root.fill(&WHITE)?;
    root.draw(&Rectangle::new([(10, 10), (790, 290)], ShapeStyle::from(&GREY).stroke_width(2)))?;
    root.draw(&Text::new(title.to_string(), (400, 120), centered(22, &BLACK)))?;
    root.draw(&Text::new(message.to_string(), (400, 180), centered(16, &RGBColor(90, 90, 90))))?;
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_placeholder_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.svg");
        render_placeholder(&path, "Volcano plot", "no genes with defined statistics").unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Volcano plot"));
    }

    #[test]
    fn test_color_scales() {
        assert_eq!(diverging(0.5), RGBColor(255, 255, 255));
        assert_eq!(diverging(f64::NAN), RGBColor(255, 255, 255));
        assert_eq!(diverging(1.0), RGBColor(215, 48, 39));
        assert_eq!(padj_color(1e-10, 1e-10, 0.05), diverging(1.0));
    }

    #[test]
    fn test_padded_range() {
        assert_eq!(padded_range(vec![f64::NAN, 1.0, 3.0], 0.5), Some((0.0, 4.0)));
        assert_eq!(padded_range(vec![2.0], 0.0), Some((2.0, 2.0)));
        assert_eq!(padded_range(vec![f64::NAN], 0.1), None);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("regulation of apoptotic process", 10), "regulatio…");
    }
}
