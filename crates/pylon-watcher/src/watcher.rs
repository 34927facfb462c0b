//! Filesystem watcher feeding the indexer

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use pylon_core::CACHE_DIR;
use pylon_indexer::{Indexer, is_source_file};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Directory names whose contents never affect the graph.
const IGNORED_DIRS: [&str; 3] = ["node_modules", ".git", CACHE_DIR];

/// Events emitted by the file watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// File created or written
    Saved(PathBuf),
    /// File deleted or renamed away
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Saved(path) | WatchEvent::Removed(path) => path,
        }
    }
}

/// Recursive watch over one directory, delivering [`WatchEvent`]s on a channel.
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    event_rx: mpsc::UnboundedReceiver<WatchEvent>,
    root_path: PathBuf,
}

impl FileWatcher {
    pub fn new(root_path: impl AsRef<Path>) -> Result<Self> {
        let root_path = root_path.as_ref().to_path_buf();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                for watch_event in classify(event) {
                    if event_tx.send(watch_event).is_err() {
                        debug!("watch event dropped, receiver closed");
                    }
                }
            }
            Err(e) => error!("file system watch error: {e}"),
        })?;

        Ok(FileWatcher {
            watcher,
            event_rx,
            root_path,
        })
    }

    pub fn start(&mut self) -> Result<()> {
        self.watcher.watch(&self.root_path, RecursiveMode::Recursive)?;
        info!("watching {}", self.root_path.display());
        Ok(())
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Next event, or `None` once the watcher is gone.
    pub async fn next_event(&mut self) -> Option<WatchEvent> {
        self.event_rx.recv().await
    }

    /// Events already queued, without waiting.
    fn drain_ready(&mut self) -> Vec<WatchEvent> {
        let mut ready = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            ready.push(event);
        }
        ready
    }
}

/// Translate a notify event into watch events for source files.
fn classify(event: notify::Event) -> Vec<WatchEvent> {
    let kind = event.kind;
    if !matches!(kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)) {
        return Vec::new();
    }

    event
        .paths
        .into_iter()
        .filter(|path| is_relevant(path))
        .map(|path| match kind {
            EventKind::Remove(_) => WatchEvent::Removed(path),
            // renames report the old name as a modify
            EventKind::Modify(_) if !path.exists() => WatchEvent::Removed(path),
            _ => WatchEvent::Saved(path),
        })
        .collect()
}

fn is_relevant(path: &Path) -> bool {
    is_source_file(path) && !should_ignore_path(path)
}

/// Whether any component of `path` is an ignored directory.
pub fn should_ignore_path(path: &Path) -> bool {
    path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| IGNORED_DIRS.contains(&name))
    })
}

/// Drives the indexer from watch events until the watcher stops.
pub struct WatcherService {
    watcher: FileWatcher,
    indexer: Arc<Indexer>,
}

impl WatcherService {
    /// Watch the indexer's analysis root.
    pub fn new(indexer: Arc<Indexer>) -> Result<Self> {
        let watcher = FileWatcher::new(&indexer.config().analysis_root)?;
        Ok(WatcherService { watcher, indexer })
    }

    pub fn start_watching(&mut self) -> Result<()> {
        self.watcher.start()
    }

    /// Process events until the channel closes. Each wake-up handles every
    /// event already queued, keeping only the last event per path.
    pub async fn process_events(&mut self) {
        while let Some(first) = self.watcher.next_event().await {
            let mut batch: BTreeMap<PathBuf, WatchEvent> = BTreeMap::new();
            for event in std::iter::once(first).chain(self.watcher.drain_ready()) {
                batch.insert(event.path().to_path_buf(), event);
            }
            for event in batch.into_values() {
                handle_event(&self.indexer, event).await;
            }
        }
        info!("file watcher stopped");
    }
}

/// Apply one event to the graph. Failures are logged, never fatal.
pub async fn handle_event(indexer: &Indexer, event: WatchEvent) {
    match event {
        WatchEvent::Saved(path) => match indexer.patch(&path).await {
            Ok(Some(edges)) => info!(file = %path.display(), edges = edges.len(), "graph patched"),
            Ok(None) => {}
            Err(e) => warn!(file = %path.display(), "patch failed: {e}"),
        },
        WatchEvent::Removed(path) => match indexer.remove(&path).await {
            Ok(true) => info!(file = %path.display(), "graph entry removed"),
            Ok(false) => {}
            Err(e) => warn!(file = %path.display(), "removal failed: {e}"),
        },
    }
}
