//! Orchestrates discovery, analysis and the graph store for one workspace

use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::GlobSet;
use pylon_core::{
    Config, ConfigError, CycleGroup, DependencyTree, Direction, EdgeSet, EdgeSource, FileId, Graph,
    GraphStore, LoadStatus, RebuildOutcome, StoreError, find_cycle_groups, normalize_path,
};

use crate::discovery::discover_files;
use crate::languages::is_source_file;
use crate::source::ImportEdgeSource;

/// How the graph was populated on activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    FromCache { files: usize },
    Rebuilt { status: LoadStatus, outcome: RebuildOutcome },
}

/// The per-workspace entry point shared by the CLI, the watcher and the server.
pub struct Indexer {
    config: Config,
    store: Arc<GraphStore>,
    exclude: GlobSet,
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("workspace", &self.config.workspace.root)
            .field("analysis_root", &self.config.analysis_root)
            .field("store", &self.store)
            .finish()
    }
}

impl Indexer {
    /// An indexer backed by the tree-sitter [`ImportEdgeSource`].
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        Indexer::with_source(config, Arc::new(ImportEdgeSource::default()))
    }

    pub fn with_source(config: Config, source: Arc<dyn EdgeSource>) -> Result<Self, ConfigError> {
        let exclude = config.exclude_set()?;
        let store = Arc::new(GraphStore::new(config.cache_path(), source));
        Ok(Indexer {
            config,
            store,
            exclude,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    /// Load the cache, falling back to a full rebuild when it is absent or corrupt.
    ///
    /// A cache that cannot be written does not fail activation; see
    /// [`RebuildOutcome::persistence_failure`].
    pub async fn activate(&self) -> Result<Activation, StoreError> {
        let status = self.store.load().await?;
        if let LoadStatus::Loaded { files } = status {
            return Ok(Activation::FromCache { files });
        }
        let outcome = self.rebuild().await?;
        Ok(Activation::Rebuilt { status, outcome })
    }

    /// Discover every source file under the analysis root and rebuild from scratch.
    pub async fn rebuild(&self) -> Result<RebuildOutcome, StoreError> {
        let root = self.config.analysis_root.clone();
        let exclude = self.exclude.clone();
        let files = tokio::task::spawn_blocking(move || discover_files(&root, &exclude))
            .await
            .map_err(|e| StoreError::Discovery(format!("walker task join error: {e}")))?;
        self.store
            .rebuild_all(&files, &self.config.resolve_options())
            .await
    }

    /// Whether saves of `path` should patch the graph.
    pub fn is_tracked(&self, path: &Path) -> bool {
        is_source_file(path)
            && path.starts_with(&self.config.analysis_root)
            && !self.exclude.is_match(path)
    }

    /// Re-analyze one saved file. Untracked files are ignored with `Ok(None)`.
    pub async fn patch(&self, path: &Path) -> Result<Option<EdgeSet>, StoreError> {
        let path = self.absolute(path);
        if !self.is_tracked(&path) {
            tracing::trace!(path = %path.display(), "ignoring untracked file");
            return Ok(None);
        }
        let edges = self
            .store
            .patch_one(&FileId::new(&path), &self.config.resolve_options())
            .await?;
        Ok(Some(edges))
    }

    /// Drop a deleted file's entry.
    pub async fn remove(&self, path: &Path) -> Result<bool, StoreError> {
        self.store.remove_one(&FileId::new(self.absolute(path))).await
    }

    pub async fn clear_cache(&self) -> Result<bool, StoreError> {
        self.store.clear_cache().await
    }

    pub async fn snapshot(&self) -> Arc<Graph> {
        self.store.snapshot().await
    }

    /// Dependency tree rooted at `path`, in either direction.
    pub async fn tree(&self, path: &Path, direction: Direction) -> DependencyTree {
        let root = FileId::new(self.absolute(path));
        let graph = self.store.snapshot().await;
        self.config.tree_builder().build(direction, &root, &graph)
    }

    pub async fn cycle_groups(&self) -> Vec<CycleGroup> {
        find_cycle_groups(&*self.store.snapshot().await)
    }

    /// Display prefix stripped from tree labels.
    pub fn root_path(&self) -> &Path {
        &self.config.workspace.root
    }

    /// Relative paths are taken from the workspace root.
    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            normalize_path(path)
        } else {
            normalize_path(&self.config.workspace.root.join(path))
        }
    }
}
