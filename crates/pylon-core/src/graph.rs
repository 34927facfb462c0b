//! The file-level import graph: `FileId -> EdgeSet`

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::{EdgeSet, FileId};
use crate::reverse::{ReverseGraph, invert};

/// Mapping from every analyzed file to its direct import targets.
///
/// Targets need not be keys themselves: files outside the analysis root show
/// up as leaf targets with no entry of their own. Keys iterate in path order.
///
/// Serializes as a plain JSON object `{ "<file>": ["<target>", ...] }`, which
/// is also the on-disk cache format.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Graph {
    entries: BTreeMap<FileId, EdgeSet>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("file_count", &self.len())
            .field("edge_count", &self.edge_count())
            .field("entries", &self.entries)
            .finish()
    }
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            entries: BTreeMap::new(),
        }
    }

    /// Insert or replace the entry for `file`. Returns the previous EdgeSet.
    pub fn insert(&mut self, file: FileId, edges: EdgeSet) -> Option<EdgeSet> {
        self.entries.insert(file, edges)
    }

    /// Remove the entry for `file`. Edges pointing at it from other entries stay.
    pub fn remove(&mut self, file: &FileId) -> Option<EdgeSet> {
        self.entries.remove(file)
    }

    /// Direct import targets of `file`, if it has an entry.
    pub fn edges(&self, file: &FileId) -> Option<&[FileId]> {
        self.entries.get(file).map(Vec::as_slice)
    }

    pub fn contains(&self, file: &FileId) -> bool {
        self.entries.contains_key(file)
    }

    /// Number of entries (analyzed files).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of edges, duplicates included.
    pub fn edge_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FileId, &[FileId])> {
        self.entries
            .iter()
            .map(|(file, edges)| (file, edges.as_slice()))
    }

    /// Analyzed files, in key order.
    pub fn files(&self) -> impl Iterator<Item = &FileId> {
        self.entries.keys()
    }

    /// Every file mentioned anywhere: keys and edge targets.
    pub fn all_files(&self) -> BTreeSet<&FileId> {
        self.entries
            .iter()
            .flat_map(|(file, edges)| std::iter::once(file).chain(edges.iter()))
            .collect()
    }

    /// Derive the dependents map for this graph.
    pub fn invert(&self) -> ReverseGraph {
        invert(self)
    }
}

impl FromIterator<(FileId, EdgeSet)> for Graph {
    fn from_iter<I: IntoIterator<Item = (FileId, EdgeSet)>>(iter: I) -> Self {
        Graph {
            entries: iter.into_iter().collect(),
        }
    }
}
