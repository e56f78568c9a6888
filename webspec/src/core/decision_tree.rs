//! Decision tree: integrity-checked forest of decision records.
//!
//! Construction is all-or-nothing. Lookups from any id to its record, parent
//! and children go through a side index rather than a traversal.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use crate::core::spec::DecisionRecord;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionTreeError {
    #[error("duplicate decision id '{0}'")]
    DuplicateId(String),
    #[error("decision '{id}' names missing parent '{parent}'")]
    MissingParent { id: String, parent: String },
    #[error("decision cycle: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },
}

/// Parent/children links for one decision id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecisionLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DecisionTree {
    records: BTreeMap<String, DecisionRecord>,
    roots: Vec<String>,
    index: BTreeMap<String, DecisionLinks>,
}

impl DecisionTree {
    /// Build and integrity-check the tree from a flat decision list.
    pub fn build(decisions: &[DecisionRecord]) -> Result<Self, DecisionTreeError> {
        let mut records = BTreeMap::new();
        let mut index: BTreeMap<String, DecisionLinks> = BTreeMap::new();
        for record in decisions {
            if records.insert(record.id.clone(), record.clone()).is_some() {
                return Err(DecisionTreeError::DuplicateId(record.id.clone()));
            }
            index.insert(record.id.clone(), DecisionLinks::default());
        }

        let mut roots = Vec::new();
        for record in decisions {
            match &record.parent {
                None => roots.push(record.id.clone()),
                Some(parent) => {
                    let parent_links = index.get_mut(parent).ok_or_else(|| {
                        DecisionTreeError::MissingParent {
                            id: record.id.clone(),
                            parent: parent.clone(),
                        }
                    })?;
                    parent_links.children.push(record.id.clone());
                    if let Some(links) = index.get_mut(&record.id) {
                        links.parent = Some(parent.clone());
                    }
                }
            }
        }

        let tree = Self {
            records,
            roots,
            index,
        };
        tree.check_acyclic()?;
        Ok(tree)
    }

    /// Depth-first walk from every root, then from any node a root never reached.
    ///
    /// With at most one parent per node, unreached nodes can only sit on (or
    /// hang off) a parent cycle, so the second sweep is what reports it.
    fn check_acyclic(&self) -> Result<(), DecisionTreeError> {
        let mut in_progress = HashSet::new();
        let mut done = HashSet::new();
        for start in self.roots.iter().chain(self.records.keys()) {
            if done.contains(start.as_str()) {
                continue;
            }
            let mut path = Vec::new();
            self.visit(start, &mut in_progress, &mut done, &mut path)?;
        }
        Ok(())
    }

    fn visit<'a>(
        &'a self,
        id: &'a str,
        in_progress: &mut HashSet<&'a str>,
        done: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
    ) -> Result<(), DecisionTreeError> {
        if done.contains(id) {
            return Ok(());
        }
        path.push(id);
        if !in_progress.insert(id) {
            let start = path.iter().position(|seen| *seen == id).unwrap_or(0);
            return Err(DecisionTreeError::Cycle {
                path: path[start..].iter().map(|s| s.to_string()).collect(),
            });
        }
        if let Some(links) = self.index.get(id) {
            for child in &links.children {
                self.visit(child, in_progress, done, path)?;
            }
        }
        in_progress.remove(id);
        done.insert(id);
        path.pop();
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&DecisionRecord> {
        self.records.get(id)
    }

    /// Ids without a parent, in input order.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn index(&self) -> &BTreeMap<String, DecisionLinks> {
        &self.index
    }
}
