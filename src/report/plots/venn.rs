//! Two-set overlap diagram

use std::path::Path;

use plotters::prelude::*;

use super::{centered, palette, PlotResult};
use crate::annotation::OverlapCounts;

pub fn render_venn(path: &Path, counts: &OverlapCounts) -> PlotResult {
    let root = SVGBackend::new(path, (800, 560)).into_drawing_area();
    root.fill(&WHITE)?;
    root.draw(&Text::new(
        "Genes with padj < 0.05".to_string(),
        (400, 30),
        centered(24, &BLACK),
    ))?;

    let (left, right, cy, r) = ((310, 490), (490, 490), 270, 170);
    let (a, b) = (palette(0), palette(1));
    for (center, color) in [((left.0, cy), a), ((right.0, cy), b)] {
        root.draw(&Circle::new(center, r, color.mix(0.3).filled()))?;
        root.draw(&Circle::new(center, r, ShapeStyle::from(&color).stroke_width(2)))?;
    }

    root.draw(&Text::new(counts.label_a.clone(), (left.0 - 90, cy - r - 16), centered(20, &a)))?;
    root.draw(&Text::new(counts.label_b.clone(), (right.0 + 90, cy - r - 16), centered(20, &b)))?;

    root.draw(&Text::new(counts.only_a.to_string(), (left.0 - 80, cy), centered(28, &BLACK)))?;
    root.draw(&Text::new(counts.both.to_string(), ((left.0 + right.0) / 2, cy), centered(28, &BLACK)))?;
    root.draw(&Text::new(counts.only_b.to_string(), (right.0 + 80, cy), centered(28, &BLACK)))?;
    root.draw(&Text::new(
        format!("neither: {}", counts.neither),
        (400, 520),
        centered(18, &RGBColor(90, 90, 90)),
    ))?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_venn_shows_counts() {
        let counts = OverlapCounts {
            label_a: "HT55".to_string(),
            label_b: "SW948".to_string(),
            only_a: 12,
            only_b: 345,
            both: 7,
            neither: 9876,
        };
        let dir = tempdir().unwrap();
        let path = dir.path().join("venn.svg");
        render_venn(&path, &counts).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        for text in ["HT55", "SW948", "345", "neither: 9876"] {
            assert!(svg.contains(text), "missing {}", text);
        }
    }
}
