//! Core data structures for the import graph

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Normalized absolute path identifying one analyzed file.
///
/// Two ids are equal iff their normalized path strings are equal. Normalization
/// is purely lexical: `.` components are dropped and `..` folds into its parent.
/// The filesystem is never consulted, so symlinks are not resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileId(normalize_path(path.as_ref()).to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// Label with `prefix` stripped, used for display.
    pub fn label(&self, prefix: &Path) -> String {
        match self.as_path().strip_prefix(prefix) {
            Ok(rest) if !rest.as_os_str().is_empty() => rest.to_string_lossy().into_owned(),
            _ => self.0.clone(),
        }
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileId {
    fn from(path: &str) -> Self {
        FileId::new(path)
    }
}

impl From<PathBuf> for FileId {
    fn from(path: PathBuf) -> Self {
        FileId::new(path)
    }
}

impl From<&Path> for FileId {
    fn from(path: &Path) -> Self {
        FileId::new(path)
    }
}

/// Lexically fold `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` stays at the root
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Direct import targets of one file, in document order.
pub type EdgeSet = Vec<FileId>;

/// One node of a materialized dependency tree.
///
/// The same file may appear in several branches as separate nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: FileId,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(name: FileId) -> Self {
        TreeNode {
            name,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }

    /// Length of the longest root-to-leaf path, counted in edges.
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &FileId) -> Option<&TreeNode> {
        self.children.iter().find(|child| &child.name == name)
    }
}

/// A back-edge found during traversal: `source` reaches `target`, which is
/// already one of its ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CycleEdge {
    pub source: FileId,
    pub target: FileId,
}

impl CycleEdge {
    pub fn new(source: FileId, target: FileId) -> Self {
        CycleEdge { source, target }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// Output of one tree build: the rooted tree plus every cycle edge found
/// anywhere in the traversal, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyTree {
    pub root: TreeNode,
    pub cycles: Vec<CycleEdge>,
    /// Set when a depth or node limit cut the unrolling short.
    pub truncated: bool,
}
