//! Change notifications broadcast by the graph store

use serde::{Deserialize, Serialize};

use crate::model::{EdgeSet, FileId};

/// A committed change to the graph, or a failure to mirror one to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEvent {
    /// Monotonically increasing per store.
    pub sequence: u64,
    #[serde(flatten)]
    pub kind: GraphEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphEventKind {
    Rebuilt {
        files: usize,
        failures: Vec<FileId>,
    },
    Patched {
        file: FileId,
        edges: EdgeSet,
    },
    Removed {
        file: FileId,
    },
    CacheCleared,
    PersistenceFailed {
        message: String,
    },
}

impl GraphEvent {
    pub fn new(sequence: u64, kind: GraphEventKind) -> Self {
        GraphEvent { sequence, kind }
    }

    /// Whether the graph content changed.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self.kind,
            GraphEventKind::Rebuilt { .. } | GraphEventKind::Patched { .. } | GraphEventKind::Removed { .. }
        )
    }
}
