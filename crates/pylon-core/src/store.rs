//! The graph store: single owner of the in-memory graph and its cache file
//!
//! Readers take cheap `Arc<Graph>` snapshots. Every mutation holds the write
//! token for its whole duration, analysis and persistence included, so a
//! rebuild and a patch can never interleave. Memory is updated first; the
//! cache file is a mirror written afterwards.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, broadcast};

use crate::cache;
use crate::error::{AnalysisFailure, StoreError};
use crate::events::{GraphEvent, GraphEventKind};
use crate::graph::Graph;
use crate::model::{EdgeSet, FileId};
use crate::source::{EdgeSource, ResolveOptions};

const EVENT_CAPACITY: usize = 256;

/// What [`GraphStore::load`] found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded { files: usize },
    Absent,
    /// The cache did not parse and has been deleted.
    Corrupt,
}

impl LoadStatus {
    /// Whether a full rebuild is needed to populate the graph.
    pub fn needs_rebuild(&self) -> bool {
        !matches!(self, LoadStatus::Loaded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildOutcome {
    /// Entries in the new graph.
    pub files: usize,
    /// Files whose analysis failed. Their previous entries, if any, were kept.
    pub failures: Vec<AnalysisFailure>,
    /// Set when the cache file could not be written. Memory holds the new
    /// graph regardless.
    pub persistence_failure: Option<String>,
}

impl RebuildOutcome {
    pub fn persisted(&self) -> bool {
        self.persistence_failure.is_none()
    }
}

struct WriterState {
    sequence: u64,
}

pub struct GraphStore {
    cache_path: PathBuf,
    source: Arc<dyn EdgeSource>,
    graph: RwLock<Arc<Graph>>,
    writer: Mutex<WriterState>,
    events: broadcast::Sender<GraphEvent>,
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("cache_path", &self.cache_path)
            .finish_non_exhaustive()
    }
}

impl GraphStore {
    /// An empty store mirroring to `cache_path`. Nothing is read until [`load`](Self::load).
    pub fn new(cache_path: impl Into<PathBuf>, source: Arc<dyn EdgeSource>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        GraphStore {
            cache_path: cache_path.into(),
            source,
            graph: RwLock::new(Arc::new(Graph::new())),
            writer: Mutex::new(WriterState { sequence: 0 }),
            events,
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Current graph. Later mutations never affect a snapshot already taken.
    pub async fn snapshot(&self) -> Arc<Graph> {
        self.graph.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GraphEvent> {
        self.events.subscribe()
    }

    /// Replace memory with the cache file's content, if it has any.
    ///
    /// A corrupt cache is deleted and reported as [`LoadStatus::Corrupt`];
    /// memory is left as it was. A cache that cannot be read at all is
    /// treated as absent.
    pub async fn load(&self) -> Result<LoadStatus, StoreError> {
        let _writer = self.writer.lock().await;

        match cache::load_graph(&self.cache_path).await {
            Ok(Some(graph)) => {
                let files = graph.len();
                *self.graph.write().await = Arc::new(graph);
                tracing::info!(files, path = %self.cache_path.display(), "loaded graph from cache");
                Ok(LoadStatus::Loaded { files })
            }
            Ok(None) => {
                tracing::debug!(path = %self.cache_path.display(), "no graph cache");
                Ok(LoadStatus::Absent)
            }
            Err(e @ StoreError::CorruptCache { .. }) => {
                tracing::warn!("{e}; cache deleted, a full rebuild is required");
                Ok(LoadStatus::Corrupt)
            }
            Err(e @ StoreError::CacheUnreadable { .. }) => {
                tracing::warn!("{e}; treating cache as absent");
                Ok(LoadStatus::Absent)
            }
            Err(e) => Err(e),
        }
    }

    /// Analyze every file in `files` and swap the result in as the whole graph.
    ///
    /// A file that fails keeps its previous entry; one that never had an entry
    /// gets none. A cache write failure does not fail the rebuild: memory
    /// already holds the new graph, and the failure is reported on the outcome
    /// and as a [`GraphEventKind::PersistenceFailed`] event.
    pub async fn rebuild_all(
        &self,
        files: &[FileId],
        options: &ResolveOptions,
    ) -> Result<RebuildOutcome, StoreError> {
        let mut writer = self.writer.lock().await;
        let previous = self.snapshot().await;

        tracing::info!(files = files.len(), "rebuilding import graph");
        let results = self.source.analyze_all(files, options).await;

        let mut next = Graph::new();
        let mut failures = Vec::new();
        for (file, result) in files.iter().zip(results) {
            match result {
                Ok(edges) => {
                    next.insert(file.clone(), edges);
                }
                Err(failure) => {
                    tracing::warn!("analysis failed: {failure}");
                    if let Some(edges) = previous.edges(file) {
                        next.insert(file.clone(), edges.to_vec());
                    }
                    failures.push(failure);
                }
            }
        }

        let next = Arc::new(next);
        *self.graph.write().await = next.clone();

        let mut outcome = RebuildOutcome {
            files: next.len(),
            failures,
            persistence_failure: None,
        };
        tracing::info!(
            files = outcome.files,
            edges = next.edge_count(),
            failures = outcome.failures.len(),
            "import graph rebuilt"
        );
        self.emit(
            &mut writer,
            GraphEventKind::Rebuilt {
                files: outcome.files,
                failures: outcome.failures.iter().map(|f| f.file.clone()).collect(),
            },
        );

        if let Err(e) = self.persist_locked(&mut writer, &next).await {
            outcome.persistence_failure = Some(e.to_string());
        }
        Ok(outcome)
    }

    /// Re-analyze one file and replace (or insert) its entry.
    ///
    /// On analysis failure nothing changes and the failure is returned. A
    /// `PersistenceFailed` error means memory was updated but the cache was not.
    pub async fn patch_one(&self, file: &FileId, options: &ResolveOptions) -> Result<EdgeSet, StoreError> {
        let mut writer = self.writer.lock().await;

        let edges = self
            .source
            .analyze(file, options)
            .await
            .map_err(|error| AnalysisFailure {
                file: file.clone(),
                error,
            })?;

        let snapshot = {
            let mut guard = self.graph.write().await;
            Arc::make_mut(&mut *guard).insert(file.clone(), edges.clone());
            guard.clone()
        };
        tracing::debug!(file = %file, edges = edges.len(), "patched graph entry");

        self.emit(
            &mut writer,
            GraphEventKind::Patched {
                file: file.clone(),
                edges: edges.clone(),
            },
        );
        self.persist_locked(&mut writer, &snapshot).await?;
        Ok(edges)
    }

    /// Drop the entry for a file that no longer exists. Edges pointing at it
    /// from other entries stay until those files are patched.
    pub async fn remove_one(&self, file: &FileId) -> Result<bool, StoreError> {
        let mut writer = self.writer.lock().await;

        let snapshot = {
            let mut guard = self.graph.write().await;
            if !guard.contains(file) {
                return Ok(false);
            }
            Arc::make_mut(&mut *guard).remove(file);
            guard.clone()
        };
        tracing::debug!(file = %file, "removed graph entry");

        self.emit(&mut writer, GraphEventKind::Removed { file: file.clone() });
        self.persist_locked(&mut writer, &snapshot).await?;
        Ok(true)
    }

    /// Delete the cache file. The in-memory graph is kept and the next
    /// mutation writes a fresh cache.
    pub async fn clear_cache(&self) -> Result<bool, StoreError> {
        let mut writer = self.writer.lock().await;
        let removed = cache::clear_cache(&self.cache_path).await?;
        tracing::info!(path = %self.cache_path.display(), removed, "cleared graph cache");
        self.emit(&mut writer, GraphEventKind::CacheCleared);
        Ok(removed)
    }

    /// Write the current graph to the cache file.
    pub async fn persist(&self) -> Result<(), StoreError> {
        let mut writer = self.writer.lock().await;
        let snapshot = self.snapshot().await;
        self.persist_locked(&mut writer, &snapshot).await
    }

    async fn persist_locked(&self, writer: &mut WriterState, graph: &Graph) -> Result<(), StoreError> {
        match cache::save_graph(graph, &self.cache_path).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!("{e}; in-memory graph remains current");
                self.emit(writer, GraphEventKind::PersistenceFailed { message: e.to_string() });
                Err(e)
            }
        }
    }

    fn emit(&self, writer: &mut WriterState, kind: GraphEventKind) {
        writer.sequence += 1;
        // No subscribers is fine
        let _ = self.events.send(GraphEvent::new(writer.sequence, kind));
    }
}
