//! Strongly connected import groups
//!
//! Tree cycle edges only describe back-edges seen from one root. For a
//! workspace-wide view, every strongly connected component with more than one
//! file (or a single file importing itself) is reported as a group.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::model::FileId;

/// Files that all reach each other through imports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleGroup {
    /// Members, sorted by path.
    pub files: Vec<FileId>,
}

impl CycleGroup {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, file: &FileId) -> bool {
        self.files.binary_search(file).is_ok()
    }
}

/// All cycle groups in `graph`, ordered by their first member.
pub fn find_cycle_groups(graph: &Graph) -> Vec<CycleGroup> {
    let mut inner: DiGraph<&FileId, ()> = DiGraph::new();
    let mut indices: HashMap<&FileId, NodeIndex> = HashMap::new();

    for file in graph.all_files() {
        let index = inner.add_node(file);
        indices.insert(file, index);
    }
    for (source, targets) in graph.iter() {
        let from = indices[source];
        for target in targets {
            inner.update_edge(from, indices[target], ());
        }
    }

    let mut groups: Vec<CycleGroup> = tarjan_scc(&inner)
        .into_iter()
        .filter(|component| match component.as_slice() {
            [single] => inner.contains_edge(*single, *single),
            _ => true,
        })
        .map(|component| {
            let mut files: Vec<FileId> = component.iter().map(|i| inner[*i].clone()).collect();
            files.sort();
            CycleGroup { files }
        })
        .collect();

    groups.sort_by(|a, b| a.files.cmp(&b.files));
    tracing::debug!(groups = groups.len(), "computed cycle groups");
    groups
}
