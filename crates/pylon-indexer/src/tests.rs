//! Workspace-level tests for the indexer

use std::fs;
use std::path::Path;

use pylon_core::{CycleEdge, Direction, FileId, LoadStatus, StoreError, TreeNode};
use tempfile::TempDir;

use crate::coordinator::{Activation, Indexer};
use pylon_core::Config;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// A small app with one import cycle: `store -> api -> store`.
fn sample_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "src/index.js",
        "import App from './App';\nimport './styles.css';\nimport React from 'react';\n",
    );
    write(root, "src/App.jsx", "import { store } from './store';\nimport Header from './components/Header';\n");
    write(root, "src/components/Header.jsx", "export default function Header() {}\n");
    write(root, "src/store.js", "const api = require('./api');\nexport const store = {};\n");
    write(root, "src/api.js", "import { store } from './store';\nexport default {};\n");
    write(root, "src/styles.css", "body {}\n");
    write(root, "node_modules/react/index.js", "module.exports = {};\n");
    dir
}

fn indexer_for(root: &Path) -> Indexer {
    Indexer::new(Config::load(root).unwrap()).unwrap()
}

fn id(root: &Path, relative: &str) -> FileId {
    FileId::new(root.canonicalize().unwrap().join(relative))
}

#[tokio::test]
async fn test_activate_rebuilds_without_cache() {
    let dir = sample_project();
    let indexer = indexer_for(dir.path());

    let activation = indexer.activate().await.unwrap();
    let Activation::Rebuilt { status, outcome } = activation.clone() else {
        panic!("expected a rebuild, got {activation:?}");
    };
    assert_eq!(status, LoadStatus::Absent);
    assert_eq!(outcome.files, 5);
    assert!(outcome.failures.is_empty());
    assert!(indexer.store().cache_path().exists());

    let graph = indexer.snapshot().await;
    let root = dir.path();
    assert_eq!(
        graph.edges(&id(root, "src/index.js")).unwrap(),
        &[id(root, "src/App.jsx"), id(root, "src/styles.css")][..]
    );
    assert!(!graph.contains(&id(root, "node_modules/react/index.js")));
}

#[tokio::test]
async fn test_second_activation_uses_cache() {
    let dir = sample_project();
    indexer_for(dir.path()).activate().await.unwrap();

    let activation = indexer_for(dir.path()).activate().await.unwrap();
    assert_eq!(activation, Activation::FromCache { files: 5 });
}

#[tokio::test]
async fn test_corrupt_cache_triggers_rebuild() {
    let dir = sample_project();
    let indexer = indexer_for(dir.path());
    fs::create_dir_all(indexer.store().cache_path().parent().unwrap()).unwrap();
    fs::write(indexer.store().cache_path(), "{\"broken\": ").unwrap();

    let activation = indexer.activate().await.unwrap();
    assert!(matches!(
        activation,
        Activation::Rebuilt {
            status: LoadStatus::Corrupt,
            ..
        }
    ));
    assert_eq!(indexer.snapshot().await.len(), 5);
}

#[tokio::test]
async fn test_dependent_tree_marks_cycle() {
    let dir = sample_project();
    let root = dir.path();
    let indexer = indexer_for(root);
    indexer.activate().await.unwrap();

    let tree = indexer.tree(Path::new("src/App.jsx"), Direction::Dependent).await;

    assert_eq!(tree.root.name, id(root, "src/App.jsx"));
    assert_eq!(
        tree.cycles,
        vec![CycleEdge::new(id(root, "src/api.js"), id(root, "src/store.js"))]
    );
    let store = tree.root.child(&id(root, "src/store.js")).unwrap();
    let api = store.child(&id(root, "src/api.js")).unwrap();
    assert_eq!(api.children, vec![TreeNode::leaf(id(root, "src/store.js"))]);
}

#[tokio::test]
async fn test_be_dependent_tree() {
    let dir = sample_project();
    let root = dir.path();
    let indexer = indexer_for(root);
    indexer.activate().await.unwrap();

    let tree = indexer
        .tree(&root.join("src/components/Header.jsx"), Direction::BeDependent)
        .await;

    let app = tree.root.child(&id(root, "src/App.jsx")).unwrap();
    assert_eq!(app.children, vec![TreeNode::leaf(id(root, "src/index.js"))]);
    assert!(tree.cycles.is_empty());
}

#[tokio::test]
async fn test_patch_picks_up_saved_file() {
    let dir = sample_project();
    let root = dir.path();
    let indexer = indexer_for(root);
    indexer.activate().await.unwrap();

    write(root, "src/components/Header.jsx", "import App from '../App';\n");
    let edges = indexer.patch(&root.join("src/components/Header.jsx")).await.unwrap();
    assert_eq!(edges, Some(vec![id(root, "src/App.jsx")]));

    let tree = indexer.tree(Path::new("src/App.jsx"), Direction::Dependent).await;
    assert!(tree.cycles.contains(&CycleEdge::new(
        id(root, "src/components/Header.jsx"),
        id(root, "src/App.jsx")
    )));

    // the cache mirrors the patch
    let reopened = indexer_for(root);
    reopened.activate().await.unwrap();
    assert_eq!(*reopened.snapshot().await, *indexer.snapshot().await);
}

#[tokio::test]
async fn test_patch_ignores_untracked_files() {
    let dir = sample_project();
    let root = dir.path();
    let indexer = indexer_for(root);
    indexer.activate().await.unwrap();

    assert_eq!(indexer.patch(&root.join("src/styles.css")).await.unwrap(), None);
    assert_eq!(
        indexer.patch(&root.join("node_modules/react/index.js")).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_remove_drops_deleted_file() {
    let dir = sample_project();
    let root = dir.path();
    let indexer = indexer_for(root);
    indexer.activate().await.unwrap();

    fs::remove_file(root.join("src/api.js")).unwrap();
    assert!(indexer.remove(&root.join("src/api.js")).await.unwrap());
    assert!(!indexer.snapshot().await.contains(&id(root, "src/api.js")));
    assert!(indexer.cycle_groups().await.is_empty());
}

#[tokio::test]
async fn test_cycle_groups() {
    let dir = sample_project();
    let root = dir.path();
    let indexer = indexer_for(root);
    indexer.activate().await.unwrap();

    let groups = indexer.cycle_groups().await;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].files, vec![id(root, "src/api.js"), id(root, "src/store.js")]);
}

#[tokio::test]
async fn test_clear_cache_keeps_graph() {
    let dir = sample_project();
    let indexer = indexer_for(dir.path());
    indexer.activate().await.unwrap();

    assert!(indexer.clear_cache().await.unwrap());
    assert!(!indexer.store().cache_path().exists());
    assert_eq!(indexer.snapshot().await.len(), 5);
}

#[tokio::test]
async fn test_unknown_root_is_single_leaf() {
    let dir = sample_project();
    let root = dir.path();
    let indexer = indexer_for(root);
    indexer.activate().await.unwrap();

    let tree = indexer.tree(Path::new("src/nope.js"), Direction::Dependent).await;
    assert_eq!(tree.root, TreeNode::leaf(id(root, "src/nope.js")));
    assert!(tree.cycles.is_empty());
}

#[tokio::test]
async fn test_unwritable_cache_does_not_block_queries() {
    let dir = sample_project();
    let root = dir.path();
    let indexer = indexer_for(root);
    let cache_path = indexer.store().cache_path().to_path_buf();
    let mut temp_name = cache_path.file_name().unwrap().to_os_string();
    temp_name.push(".tmp");
    fs::create_dir_all(cache_path.with_file_name(temp_name)).unwrap();

    let activation = indexer.activate().await.unwrap();
    let Activation::Rebuilt { outcome, .. } = activation else {
        panic!("expected a rebuild, got {activation:?}");
    };
    assert_eq!(outcome.files, 5);
    assert!(outcome.persistence_failure.is_some());
    assert!(!cache_path.exists());

    let tree = indexer.tree(Path::new("src/store.js"), Direction::Dependent).await;
    assert_eq!(tree.cycles.len(), 1);

    write(root, "src/api.js", "export default {};\n");
    let err = indexer.patch(&root.join("src/api.js")).await.unwrap_err();
    assert!(matches!(err, StoreError::PersistenceFailed { .. }));
    assert_eq!(indexer.snapshot().await.edges(&id(root, "src/api.js")), Some(&[][..]));
    assert!(indexer.cycle_groups().await.is_empty());

    fs::remove_file(root.join("src/App.jsx")).unwrap();
    let err = indexer.remove(&root.join("src/App.jsx")).await.unwrap_err();
    assert!(matches!(err, StoreError::PersistenceFailed { .. }));
    assert!(!indexer.snapshot().await.contains(&id(root, "src/App.jsx")));
}

#[tokio::test]
async fn test_unreadable_cache_location_triggers_rebuild() {
    let dir = sample_project();
    let root = dir.path();
    write(root, "blocker", "");
    write(root, "pylon.toml", "cache_dir = \"blocker/sub\"\n");
    let indexer = indexer_for(root);

    let activation = indexer.activate().await.unwrap();
    let Activation::Rebuilt { status, outcome } = activation else {
        panic!("expected a rebuild, got {activation:?}");
    };
    assert_eq!(status, LoadStatus::Absent);
    assert_eq!(outcome.files, 5);
    assert!(!outcome.persisted());
    assert_eq!(indexer.cycle_groups().await.len(), 1);
}
