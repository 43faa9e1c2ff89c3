//! Gene Ontology graph loaded from OBO

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use crate::error::{ReportError, Result};

pub const BIOLOGICAL_PROCESS: &str = "biological_process";

/// One non-obsolete term with its `is_a` and `part_of` parents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoTerm {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub parents: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Ontology {
    terms: HashMap<String, GoTerm>,
}

/// Identifier before any trailing `! comment`
fn first_token(value: &str) -> Option<&str> {
    value.split_whitespace().next()
}

impl Ontology {
    pub fn from_obo<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let ontology = Self::parse_obo(&text)?;
        log::info!(
            "Read {} ontology terms from {}",
            ontology.len(),
            path.as_ref().display()
        );
        Ok(ontology)
    }

    /// Parse `[Term]` stanzas; other stanza types and obsolete terms are skipped
    pub fn parse_obo(text: &str) -> Result<Self> {
        let mut terms = HashMap::new();
        let mut current: Option<GoTerm> = None;
        let mut obsolete = false;
        let mut in_term = false;

        let mut finish = |term: Option<GoTerm>, obsolete: bool| {
            if let Some(term) = term.filter(|t| !obsolete && !t.id.is_empty()) {
                terms.insert(term.id.clone(), term);
            }
        };

        for line in text.lines() {
            let line = line.trim();
            if line.starts_with('[') {
                finish(current.take(), obsolete);
                obsolete = false;
                in_term = line == "[Term]";
                if in_term {
                    current = Some(GoTerm {
                        id: String::new(),
                        name: String::new(),
                        namespace: String::new(),
                        parents: Vec::new(),
                    });
                }
                continue;
            }
            let (Some(term), true) = (current.as_mut(), in_term) else {
                continue;
            };
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "id" => term.id = value.to_string(),
                "name" => term.name = value.to_string(),
                "namespace" => term.namespace = value.to_string(),
                "is_a" => {
                    if let Some(parent) = first_token(value) {
                        term.parents.push(parent.to_string());
                    }
                }
                "relationship" => {
                    let mut parts = value.split_whitespace();
                    if let (Some("part_of"), Some(parent)) = (parts.next(), parts.next()) {
                        term.parents.push(parent.to_string());
                    }
                }
                "is_obsolete" => obsolete = value == "true",
                _ => {}
            }
        }
        finish(current.take(), obsolete);

        if terms.is_empty() {
            return Err(ReportError::Ontology {
                reason: "no [Term] stanzas found".to_string(),
            });
        }
        Ok(Self { terms })
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn term(&self, id: &str) -> Option<&GoTerm> {
        self.terms.get(id)
    }

    /// Parents of a term that are present in the ontology
    pub fn parents(&self, id: &str) -> impl Iterator<Item = &str> {
        self.terms
            .get(id)
            .into_iter()
            .flat_map(|t| t.parents.iter())
            .filter(|p| self.terms.contains_key(p.as_str()))
            .map(|p| p.as_str())
    }

    /// All terms reachable through parent edges, excluding `id` itself
    pub fn ancestors(&self, id: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = self.parents(id).collect();
        while let Some(term) = stack.pop() {
            if term != id && seen.insert(term.to_string()) {
                stack.extend(self.parents(term));
            }
        }
        seen
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const OBO: &str = "\
format-version: 1.2

[Term]
id: GO:0008150
name: biological_process
namespace: biological_process

[Term]
id: GO:0009987
name: cellular process
namespace: biological_process
is_a: GO:0008150 ! biological_process

[Term]
id: GO:0006915
name: apoptotic process
namespace: biological_process
is_a: GO:0009987 ! cellular process

[Term]
id: GO:0097190
name: apoptotic signaling pathway
namespace: biological_process
relationship: part_of GO:0006915 ! apoptotic process

[Term]
id: GO:0000001
name: old term
namespace: biological_process
is_obsolete: true

[Term]
id: GO:0005575
name: cellular_component
namespace: cellular_component

[Typedef]
id: part_of
name: part of
";

    #[test]
    fn test_parse_skips_obsolete_and_typedef() {
        let ontology = Ontology::parse_obo(OBO).unwrap();
        assert_eq!(ontology.len(), 5);
        assert!(ontology.term("GO:0000001").is_none());
        assert!(ontology.term("part_of").is_none());
        assert_eq!(ontology.term("GO:0006915").unwrap().name, "apoptotic process");
    }

    #[test]
    fn test_ancestors_follow_is_a_and_part_of() {
        let ontology = Ontology::parse_obo(OBO).unwrap();
        let ancestors: Vec<String> = ontology.ancestors("GO:0097190").into_iter().collect();
        assert_eq!(ancestors, vec!["GO:0006915", "GO:0008150", "GO:0009987"]);
        assert!(ontology.ancestors("GO:0008150").is_empty());
    }

    #[test]
    fn test_empty_is_error() {
        assert!(matches!(
            Ontology::parse_obo("format-version: 1.2\n"),
            Err(ReportError::Ontology { .. })
        ));
    }
}
