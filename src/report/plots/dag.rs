//! Layered drawing of the category subgraph

use std::collections::HashMap;
use std::path::Path;

use plotters::prelude::*;

use super::{centered, padj_color, truncate, PlotResult, GREY};
use crate::enrichment::CategoryDag;

const BOX_W: i32 = 170;
const BOX_H: i32 = 46;
const LAYER_GAP: i32 = 110;
const NODE_GAP: i32 = 24;

/// Roots at the top, one row per depth, edges drawn from each child to its
/// parents. Top categories are colored by adjusted p-value, ancestors grey.
pub fn render_dag(path: &Path, title: &str, dag: &CategoryDag) -> PlotResult {
    if dag.is_empty() {
        return Err("no categories to draw".into());
    }

    let mut layers: Vec<Vec<usize>> = vec![Vec::new(); dag.max_depth() + 1];
    for (i, node) in dag.nodes.iter().enumerate() {
        layers[node.depth].push(i);
    }
    let widest = layers.iter().map(Vec::len).max().unwrap_or(1) as i32;
    let width = (widest * (BOX_W + NODE_GAP) + NODE_GAP).max(700);
    let height = 90 + layers.len() as i32 * LAYER_GAP;

    let mut centers: HashMap<&str, (i32, i32)> = HashMap::new();
    for (depth, layer) in layers.iter().enumerate() {
        let span = layer.len() as i32 * (BOX_W + NODE_GAP) - NODE_GAP;
        let x0 = (width - span) / 2 + BOX_W / 2;
        for (k, &i) in layer.iter().enumerate() {
            let center = (x0 + k as i32 * (BOX_W + NODE_GAP), 90 + depth as i32 * LAYER_GAP);
            centers.insert(dag.nodes[i].id.as_str(), center);
        }
    }

    let (p_lo, p_hi) = dag
        .nodes
        .iter()
        .filter_map(|n| n.p_adjust)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p), hi.max(p)));

    let root = SVGBackend::new(path, (width as u32, height as u32)).into_drawing_area();
    root.fill(&WHITE)?;
    root.draw(&Text::new(title.to_string(), (width / 2, 26), centered(22, &BLACK)))?;

    for edge in &dag.edges {
        if let (Some(&(cx, cy)), Some(&(px, py))) =
            (centers.get(edge.child.as_str()), centers.get(edge.parent.as_str()))
        {
            root.draw(&PathElement::new(
                vec![(cx, cy - BOX_H / 2), (px, py + BOX_H / 2)],
                RGBColor(90, 90, 90).stroke_width(1),
            ))?;
            root.draw(&Circle::new((px, py + BOX_H / 2), 3, RGBColor(90, 90, 90).filled()))?;
        }
    }

    for node in &dag.nodes {
        let Some(&(x, y)) = centers.get(node.id.as_str()) else {
            continue;
        };
        let fill = match node.p_adjust {
            Some(p) => padj_color(p, p_lo, p_hi),
            None => GREY,
        };
        let corners = [(x - BOX_W / 2, y - BOX_H / 2), (x + BOX_W / 2, y + BOX_H / 2)];
        root.draw(&Rectangle::new(corners, fill.mix(0.85).filled()))?;
        root.draw(&Rectangle::new(corners, ShapeStyle::from(&BLACK).stroke_width(1)))?;
        root.draw(&Text::new(node.id.clone(), (x, y - 9), centered(12, &BLACK)))?;
        root.draw(&Text::new(truncate(&node.name, 26), (x, y + 9), centered(11, &BLACK)))?;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::{DagEdge, DagNode};
    use tempfile::tempdir;

    fn node(id: &str, name: &str, depth: usize, p_adjust: Option<f64>) -> DagNode {
        DagNode {
            id: id.to_string(),
            name: name.to_string(),
            depth,
            p_adjust,
        }
    }

    #[test]
    fn test_dag_renders_nodes() {
        let dag = CategoryDag {
            nodes: vec![
                node("GO:0008150", "biological_process", 0, None),
                node("GO:0009987", "cellular process", 1, Some(0.01)),
                node("GO:0006915", "apoptotic process", 2, Some(1e-5)),
            ],
            edges: vec![
                DagEdge {
                    child: "GO:0009987".to_string(),
                    parent: "GO:0008150".to_string(),
                },
                DagEdge {
                    child: "GO:0006915".to_string(),
                    parent: "GO:0009987".to_string(),
                },
            ],
        };
        let dir = tempdir().unwrap();
        let path = dir.path().join("dag.svg");
        render_dag(&path, "HT55 top categories", &dag).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("GO:0006915"));
        assert!(svg.contains("apoptotic process"));
    }

    #[test]
    fn test_empty_dag_is_error() {
        let dir = tempdir().unwrap();
        assert!(render_dag(&dir.path().join("dag.svg"), "empty", &CategoryDag::default()).is_err());
    }
}
