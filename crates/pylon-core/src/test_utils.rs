//! Test utilities for Pylon Core

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;

use crate::error::AnalysisError;
use crate::graph::Graph;
use crate::model::{EdgeSet, FileId};
use crate::source::{EdgeSource, ResolveOptions};

/// Build a graph from `(file, targets)` pairs.
pub fn graph_of(entries: &[(&str, &[&str])]) -> Graph {
    entries
        .iter()
        .map(|(file, targets)| {
            (
                FileId::from(*file),
                targets.iter().map(|t| FileId::from(*t)).collect(),
            )
        })
        .collect()
}

/// Create an empty temporary workspace.
pub fn create_workspace() -> TempDir {
    TempDir::new().unwrap()
}

/// Write `contents` to `relative` under `root`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// EdgeSource answering from a mutable table. Files missing from the table
/// fail with `Unreadable`.
#[derive(Default)]
pub struct TableSource {
    table: Mutex<HashMap<FileId, Result<EdgeSet, AnalysisError>>>,
    calls: AtomicUsize,
}

impl TableSource {
    pub fn new(entries: &[(&str, &[&str])]) -> Self {
        let source = TableSource::default();
        for (file, targets) in entries {
            source.set(file, targets);
        }
        source
    }

    pub fn set(&self, file: &str, targets: &[&str]) {
        let edges = targets.iter().map(|t| FileId::from(*t)).collect();
        self.table
            .lock()
            .unwrap()
            .insert(FileId::from(file), Ok(edges));
    }

    pub fn fail(&self, file: &str) {
        self.table.lock().unwrap().insert(
            FileId::from(file),
            Err(AnalysisError::Parse("scripted failure".to_string())),
        );
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EdgeSource for TableSource {
    async fn analyze(&self, file: &FileId, _options: &ResolveOptions) -> Result<EdgeSet, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table
            .lock()
            .unwrap()
            .get(file)
            .cloned()
            .unwrap_or_else(|| Err(AnalysisError::Unreadable(format!("{file}: not found"))))
    }
}

pub fn ids(items: &[&str]) -> Vec<FileId> {
    items.iter().map(|s| FileId::from(*s)).collect()
}
