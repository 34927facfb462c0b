//! Reverse index: which files directly import a given file

use std::collections::BTreeMap;

use crate::graph::Graph;
use crate::model::FileId;

/// Derived `FileId -> dependents` mapping.
///
/// Never stored or patched; rebuild it from the graph whenever it is needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReverseGraph {
    dependents: BTreeMap<FileId, Vec<FileId>>,
}

impl ReverseGraph {
    /// Files that import `file` directly, each listed once, in graph key order.
    pub fn dependents(&self, file: &FileId) -> Option<&[FileId]> {
        self.dependents.get(file).map(Vec::as_slice)
    }

    pub fn contains(&self, file: &FileId) -> bool {
        self.dependents.contains_key(file)
    }

    pub fn len(&self) -> usize {
        self.dependents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FileId, &[FileId])> {
        self.dependents
            .iter()
            .map(|(file, dependents)| (file, dependents.as_slice()))
    }
}

/// Invert `graph`. Every file that appears in it, as key or as target, gets
/// an entry, possibly empty.
pub fn invert(graph: &Graph) -> ReverseGraph {
    let mut dependents: BTreeMap<FileId, Vec<FileId>> = BTreeMap::new();

    for (source, targets) in graph.iter() {
        dependents.entry(source.clone()).or_default();
        for target in targets {
            let list = dependents.entry(target.clone()).or_default();
            // Sources arrive one at a time, so a repeat is always the last element.
            if list.last() != Some(source) {
                list.push(source.clone());
            }
        }
    }

    ReverseGraph { dependents }
}
