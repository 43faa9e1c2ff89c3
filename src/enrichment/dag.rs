//! Subgraph of the ontology around the top enriched categories

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::ontology::Ontology;
use super::EnrichmentResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DagNode {
    pub id: String,
    pub name: String,
    /// Longest path from a root of the subgraph
    pub depth: usize,
    /// Set for the top categories only
    pub p_adjust: Option<f64>,
}

/// Edge from a child term to its parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DagEdge {
    pub child: String,
    pub parent: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryDag {
    /// Ordered by depth, then identifier
    pub nodes: Vec<DagNode>,
    pub edges: Vec<DagEdge>,
}

impl CategoryDag {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }
}

fn depth_of(
    id: &str,
    parents: &BTreeMap<&str, Vec<&str>>,
    memo: &mut BTreeMap<String, usize>,
    visiting: &mut BTreeSet<String>,
) -> usize {
    if let Some(&d) = memo.get(id) {
        return d;
    }
    if !visiting.insert(id.to_string()) {
        return 0;
    }
    let depth = parents
        .get(id)
        .map(|ps| {
            ps.iter()
                .map(|p| depth_of(p, parents, memo, visiting) + 1)
                .max()
                .unwrap_or(0)
        })
        .unwrap_or(0);
    visiting.remove(id);
    memo.insert(id.to_string(), depth);
    depth
}

/// Top `top_k` categories of `result` plus all of their ancestors, with
/// child-to-parent edges restricted to the subgraph
pub fn category_dag(result: &EnrichmentResult, ontology: &Ontology, top_k: usize) -> CategoryDag {
    let top: BTreeMap<&str, f64> = result
        .rows
        .iter()
        .take(top_k)
        .map(|r| (r.id.as_str(), r.p_adjust))
        .collect();

    let mut members: BTreeSet<String> = BTreeSet::new();
    for id in top.keys() {
        if ontology.term(id).is_some() {
            members.insert(id.to_string());
            members.extend(ontology.ancestors(id));
        }
    }

    let parents: BTreeMap<&str, Vec<&str>> = members
        .iter()
        .map(|id| {
            let ps = ontology.parents(id).filter(|p| members.contains(*p)).collect();
            (id.as_str(), ps)
        })
        .collect();

    let mut memo = BTreeMap::new();
    let mut visiting = BTreeSet::new();
    let mut nodes: Vec<DagNode> = members
        .iter()
        .map(|id| DagNode {
            id: id.clone(),
            name: ontology.term(id).map(|t| t.name.clone()).unwrap_or_default(),
            depth: depth_of(id, &parents, &mut memo, &mut visiting),
            p_adjust: top.get(id.as_str()).copied(),
        })
        .collect();
    nodes.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.id.cmp(&b.id)));

    let edges = parents
        .iter()
        .flat_map(|(child, ps)| {
            ps.iter().map(move |p| DagEdge {
                child: child.to_string(),
                parent: p.to_string(),
            })
        })
        .collect();

    CategoryDag { nodes, edges }
}
