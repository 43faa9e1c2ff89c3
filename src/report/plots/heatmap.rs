//! Heatmap of transformed values for the top-ranked genes

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontTransform;

use super::{centered, diverging, padded_range, palette, PlotResult, FONT};
use crate::annotation::AnnotatedRow;
use crate::transform::VstResult;

const CELL_W: i32 = 44;
const CELL_H: i32 = 26;
const LEFT: i32 = 140;
const TOP: i32 = 110;

/// One row per ranked gene, one column per sample. Columns carry a colored
/// group bar (cell line and condition); rows are labelled by symbol.
pub fn render_heatmap(
    path: &Path,
    title: &str,
    vst: &VstResult,
    rows: &[&AnnotatedRow],
    column_groups: &[String],
) -> PlotResult {
    if column_groups.len() != vst.sample_ids.len() {
        return Err(format!(
            "{} column groups for {} samples",
            column_groups.len(),
            vst.sample_ids.len()
        )
        .into());
    }
    let index: HashMap<&str, usize> = vst
        .gene_ids
        .iter()
        .enumerate()
        .map(|(i, g)| (g.as_str(), i))
        .collect();
    let genes: Vec<(&str, usize)> = rows
        .iter()
        .filter_map(|r| index.get(r.gene_id.as_str()).map(|&i| (r.label(), i)))
        .collect();
    if genes.is_empty() {
        return Err("none of the ranked genes are in the transformed matrix".into());
    }

    let (lo, hi) = padded_range(
        genes.iter().flat_map(|&(_, i)| vst.data.row(i).to_vec()),
        0.0,
    )
    .ok_or("no finite values")?;

    let n_cols = vst.sample_ids.len() as i32;
    let n_rows = genes.len() as i32;
    let width = (LEFT + n_cols * CELL_W + 220).max(600);
    let height = TOP + n_rows * CELL_H + 140;
    let root = SVGBackend::new(path, (width as u32, height as u32)).into_drawing_area();
    root.fill(&WHITE)?;
    root.draw(&Text::new(title.to_string(), (width / 2, 24), centered(22, &BLACK)))?;

    let mut groups: BTreeMap<&str, RGBColor> = BTreeMap::new();
    for g in column_groups {
        let next = groups.len();
        groups.entry(g.as_str()).or_insert_with(|| palette(next));
    }

    let label_style = (FONT, 12)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Right, VPos::Center));
    for (c, (sample, group)) in vst.sample_ids.iter().zip(column_groups).enumerate() {
        let x = LEFT + c as i32 * CELL_W;
        let color = groups.get(group.as_str()).copied().unwrap_or(BLACK);
        root.draw(&Rectangle::new([(x, TOP - 18), (x + CELL_W, TOP - 4)], color.filled()))?;
        root.draw(&Text::new(
            sample.clone(),
            (x + CELL_W / 2, TOP - 26),
            (FONT, 11)
                .into_font()
                .transform(FontTransform::Rotate270)
                .color(&BLACK)
                .pos(Pos::new(HPos::Left, VPos::Center)),
        ))?;
    }

    for (r, &(label, gene)) in genes.iter().enumerate() {
        let y = TOP + r as i32 * CELL_H;
        root.draw(&Text::new(label.to_string(), (LEFT - 8, y + CELL_H / 2), label_style.clone()))?;
        for (c, &value) in vst.data.row(gene).iter().enumerate() {
            let x = LEFT + c as i32 * CELL_W;
            let t = if hi > lo { (value - lo) / (hi - lo) } else { 0.5 };
            root.draw(&Rectangle::new([(x, y), (x + CELL_W, y + CELL_H)], diverging(t).filled()))?;
        }
    }

    // Color key and group legend
    let key_x = LEFT + n_cols * CELL_W + 30;
    for step in 0..20 {
        let y = TOP + step * 6;
        let t = 1.0 - step as f64 / 19.0;
        root.draw(&Rectangle::new([(key_x, y), (key_x + 18, y + 6)], diverging(t).filled()))?;
    }
    let key_style = (FONT, 12)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Left, VPos::Center));
    root.draw(&Text::new(format!("{:.1}", hi), (key_x + 24, TOP), key_style.clone()))?;
    root.draw(&Text::new(format!("{:.1}", lo), (key_x + 24, TOP + 120), key_style.clone()))?;

    for (k, (group, color)) in groups.iter().enumerate() {
        let y = TOP + 150 + k as i32 * 20;
        root.draw(&Rectangle::new([(key_x, y), (key_x + 14, y + 14)], color.filled()))?;
        root.draw(&Text::new(group.to_string(), (key_x + 20, y + 7), key_style.clone()))?;
    }

    root.present()?;
    Ok(())
}
