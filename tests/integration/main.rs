//! Integration tests for pylon
//!
//! These exercise the indexer, watcher handling, server handlers and the CLI
//! binary against one throwaway TypeScript project.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use pylon_core::{Config, Direction, FileId, GraphEventKind, TreeNode};
use pylon_indexer::{Activation, Indexer};
use pylon_watcher::{WatchEvent, handle_event};
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// `main -> (@app/router, ./util)`, `router -> ./pages/home`, `home -> ../router`
fn typed_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "tsconfig.json",
        r#"{
  "compilerOptions": {
    "baseUrl": ".",
    // editor-style comment
    "paths": { "@app/*": ["src/*"] },
  },
}"#,
    );
    write(root, "pylon.toml", "mode = \"typed\"\n");
    write(root, "src/main.ts", "import { route } from '@app/router';\nimport { fmt } from './util.js';\n");
    write(root, "src/router.ts", "export const route = () => import('./pages/home');\n");
    write(root, "src/pages/home.tsx", "import { route } from '../router';\nexport default () => <div />;\n");
    write(root, "src/util.ts", "export const fmt = (s: string) => s;\n");
    write(root, "src/types.d.ts", "declare const x: number;\n");
    dir
}

fn id(root: &Path, relative: &str) -> FileId {
    FileId::new(root.canonicalize().unwrap().join(relative))
}

#[tokio::test]
async fn test_typed_project_end_to_end() {
    let dir = typed_project();
    let root = dir.path();
    let indexer = Indexer::new(Config::load(root).unwrap()).unwrap();

    let activation = indexer.activate().await.unwrap();
    assert!(matches!(activation, Activation::Rebuilt { .. }));
    assert_eq!(indexer.snapshot().await.len(), 4);

    let tree = indexer.tree(Path::new("src/main.ts"), Direction::Dependent).await;
    assert_eq!(
        tree.root
            .children
            .iter()
            .map(|child| child.name.clone())
            .collect::<Vec<_>>(),
        vec![id(root, "src/router.ts"), id(root, "src/util.ts")]
    );
    let home = tree
        .root
        .child(&id(root, "src/router.ts"))
        .and_then(|router| router.child(&id(root, "src/pages/home.tsx")))
        .unwrap();
    assert_eq!(home.children, vec![TreeNode::leaf(id(root, "src/router.ts"))]);
    assert_eq!(tree.cycles.len(), 1);

    let reverse = indexer.tree(Path::new("src/util.ts"), Direction::BeDependent).await;
    assert_eq!(reverse.root.children, vec![TreeNode::leaf(id(root, "src/main.ts"))]);
}

#[tokio::test]
async fn test_saves_flow_to_subscribers_and_cache() {
    let dir = typed_project();
    let root = dir.path();
    let indexer = Arc::new(Indexer::new(Config::load(root).unwrap()).unwrap());
    indexer.activate().await.unwrap();
    let mut events = indexer.store().subscribe();

    // break the cycle
    write(root, "src/pages/home.tsx", "export default () => <div />;\n");
    handle_event(&indexer, WatchEvent::Saved(root.join("src/pages/home.tsx"))).await;

    let event = events.recv().await.unwrap();
    assert!(matches!(
        event.kind,
        GraphEventKind::Patched { ref file, ref edges } if *file == id(root, "src/pages/home.tsx") && edges.is_empty()
    ));
    assert!(indexer.cycle_groups().await.is_empty());

    let reopened = Indexer::new(Config::load(root).unwrap()).unwrap();
    assert_eq!(
        reopened.activate().await.unwrap(),
        Activation::FromCache { files: 4 }
    );
    assert_eq!(*reopened.snapshot().await, *indexer.snapshot().await);
}

#[test]
fn test_cli_deps_json() {
    let dir = typed_project();
    let output = Command::new(env!("CARGO_BIN_EXE_pylon"))
        .args(["--root"])
        .arg(dir.path())
        .args(["deps", "src/main.ts", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let root_path = payload["rootPath"].as_str().unwrap();
    assert!(payload["root"]["name"].as_str().unwrap().starts_with(root_path));
    assert_eq!(payload["root"]["children"].as_array().unwrap().len(), 2);
    assert_eq!(payload["truncated"], false);
}

#[test]
fn test_cli_deps_with_unusable_cache_dir() {
    let dir = typed_project();
    write(dir.path(), "blocker", "");
    write(dir.path(), "pylon.toml", "mode = \"typed\"\ncache_dir = \"blocker/sub\"\n");

    let output = Command::new(env!("CARGO_BIN_EXE_pylon"))
        .arg("--root")
        .arg(dir.path())
        .args(["deps", "src/main.ts", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stderr).contains("graph cache not saved"));

    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["root"]["children"].as_array().unwrap().len(), 2);
}

#[test]
fn test_cli_cycles_and_clear() {
    let dir = typed_project();
    let run = |args: &[&str]| {
        let output = Command::new(env!("CARGO_BIN_EXE_pylon"))
            .arg("--root")
            .arg(dir.path())
            .args(args)
            .output()
            .unwrap();
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        String::from_utf8(output.stdout).unwrap()
    };

    let cycles = run(&["cycles"]);
    assert!(cycles.contains("cycle 1 (2 files)"));
    assert!(cycles.contains("src/router.ts"));

    assert!(run(&["clear"]).starts_with("removed"));
    assert!(run(&["clear"]).starts_with("no cache"));
}
