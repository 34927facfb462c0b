//! Filesystem watching: saves patch the graph, deletions remove entries

pub mod watcher;

pub use watcher::{FileWatcher, WatchEvent, WatcherService, handle_event, should_ignore_path};
