//! On-disk mirror of the import graph
//!
//! One JSON file per workspace, `<cache_dir>/<workspace>-pylon.json`, holding
//! the graph as a plain object of path to import list. Writes go through a
//! `.tmp` sibling renamed over the target.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::graph::Graph;

/// Default cache directory, relative to the workspace root.
pub const CACHE_DIR: &str = ".pylon";

/// Suffix appended to the workspace name to form the cache file name.
pub const CACHE_SUFFIX: &str = "-pylon.json";

/// `<workspace>-pylon.json`
pub fn cache_file_name(workspace_name: &str) -> String {
    format!("{workspace_name}{CACHE_SUFFIX}")
}

/// Full cache file path for a workspace.
pub fn graph_cache_path(cache_dir: &Path, workspace_name: &str) -> PathBuf {
    cache_dir.join(cache_file_name(workspace_name))
}

/// Read the cache file.
///
/// A missing file is `Ok(None)`. A file that does not parse as a graph is
/// deleted and reported as [`StoreError::CorruptCache`]; nothing from it is
/// returned.
pub async fn load_graph(path: &Path) -> Result<Option<Graph>, StoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::CacheUnreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    match serde_json::from_slice::<Graph>(&bytes) {
        Ok(graph) => {
            tracing::debug!(path = %path.display(), files = graph.len(), "graph cache loaded");
            Ok(Some(graph))
        }
        Err(e) => {
            if let Err(remove_err) = tokio::fs::remove_file(path).await {
                tracing::warn!(path = %path.display(), error = %remove_err, "failed to delete corrupt cache");
            }
            Err(StoreError::CorruptCache {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    }
}

/// Write `graph` to `path`, creating the parent directory if needed.
pub async fn save_graph(graph: &Graph, path: &Path) -> Result<(), StoreError> {
    let failed = |reason: String| StoreError::PersistenceFailed {
        path: path.to_path_buf(),
        reason,
    };

    let json = serde_json::to_vec(graph).map_err(|e| failed(e.to_string()))?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| failed(e.to_string()))?;
    }

    let temp_path = temp_path(path);
    if let Err(e) = tokio::fs::write(&temp_path, &json).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(failed(e.to_string()));
    }
    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(|e| failed(e.to_string()))?;

    tracing::debug!(path = %path.display(), files = graph.len(), bytes = json.len(), "graph cache saved");
    Ok(())
}

/// Delete the cache file. Returns whether a file was removed.
pub async fn clear_cache(path: &Path) -> Result<bool, StoreError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::PersistenceFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

/// `cache.json` -> `cache.json.tmp`
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("graph"));
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_workspace, graph_of};

    #[test]
    fn test_cache_path_uses_workspace_name() {
        let path = graph_cache_path(Path::new("/repo/.pylon"), "shop");
        assert_eq!(path, Path::new("/repo/.pylon/shop-pylon.json"));
    }

    #[test]
    fn test_temp_path_is_a_sibling() {
        assert_eq!(
            temp_path(Path::new("/c/w-pylon.json")),
            Path::new("/c/w-pylon.json.tmp")
        );
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let dir = create_workspace();
        let path = dir.path().join(".pylon").join("w-pylon.json");
        let graph = graph_of(&[("/a", &["/c", "/b", "/c"]), ("/b", &[]), ("/c", &["/a"])]);

        save_graph(&graph, &path).await.unwrap();
        let loaded = load_graph(&path).await.unwrap().unwrap();

        assert_eq!(loaded, graph);
        assert_eq!(loaded.edges(&"/a".into()).unwrap().len(), 3);
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_missing_cache_is_none() {
        let dir = create_workspace();
        let loaded = load_graph(&dir.path().join("nope.json")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_cache_under_regular_file_is_unreadable() {
        let dir = create_workspace();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let err = load_graph(&blocker.join("w-pylon.json")).await.unwrap_err();
        assert!(matches!(err, StoreError::CacheUnreadable { .. }));
        assert!(blocker.is_file());
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_deleted() {
        let dir = create_workspace();
        let path = dir.path().join("w-pylon.json");
        std::fs::write(&path, r#"{"/a": ["/b""#).unwrap();

        let err = load_graph(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::CorruptCache { .. }));
        assert!(!path.exists());
        assert!(load_graph(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wrong_shape_is_corrupt() {
        let dir = create_workspace();
        let path = dir.path().join("w-pylon.json");
        std::fs::write(&path, r#"{"/a": "/b"}"#).unwrap();

        assert!(matches!(
            load_graph(&path).await,
            Err(StoreError::CorruptCache { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_graph_persists() {
        let dir = create_workspace();
        let path = dir.path().join("w-pylon.json");
        save_graph(&Graph::new(), &path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_clear_reports_whether_removed() {
        let dir = create_workspace();
        let path = dir.path().join("w-pylon.json");
        save_graph(&graph_of(&[("/a", &[])]), &path).await.unwrap();

        assert!(clear_cache(&path).await.unwrap());
        assert!(!clear_cache(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_save_into_unwritable_location_fails() {
        let dir = create_workspace();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        // Parent is a regular file, so the directory cannot be created
        let path = blocker.join("w-pylon.json");

        let err = save_graph(&Graph::new(), &path).await.unwrap_err();
        assert!(matches!(err, StoreError::PersistenceFailed { .. }));
    }
}
