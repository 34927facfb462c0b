//! Materialized dependency trees with cycle detection
//!
//! A tree is an unrolling of the graph from one root. The traversal keeps the
//! explicit ancestor path rather than a global visited set, so a file reached
//! through two different branches is expanded in both. Reaching a file that is
//! already on the path records a [`CycleEdge`] and stops that branch with a
//! childless leaf.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::model::{CycleEdge, DependencyTree, FileId, TreeNode};
use crate::reverse::ReverseGraph;

/// Default depth cap, in edges from the root.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default cap on the number of nodes in one tree.
pub const DEFAULT_MAX_NODES: usize = 20_000;

/// Bounds for pathological acyclic graphs, where full unrolling grows
/// combinatorially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeLimits {
    /// Nodes at this depth are emitted as leaves.
    pub max_depth: usize,
    /// Once the tree holds this many nodes no further children are added.
    pub max_nodes: usize,
}

impl TreeLimits {
    pub const UNBOUNDED: TreeLimits = TreeLimits {
        max_depth: usize::MAX,
        max_nodes: usize::MAX,
    };
}

impl Default for TreeLimits {
    fn default() -> Self {
        TreeLimits {
            max_depth: DEFAULT_MAX_DEPTH,
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

/// Which adjacency a traversal follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Outgoing edges: what the root imports, transitively.
    #[default]
    Dependent,
    /// Incoming edges: what transitively imports the root.
    BeDependent,
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dependent" | "deps" | "forward" => Ok(Direction::Dependent),
            "be-dependent" | "rdeps" | "reverse" => Ok(Direction::BeDependent),
            other => Err(format!("unknown direction `{other}`")),
        }
    }
}

/// Builds dependency trees from a graph snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeBuilder {
    limits: TreeLimits,
}

impl TreeBuilder {
    pub fn new(limits: TreeLimits) -> Self {
        TreeBuilder { limits }
    }

    pub fn limits(&self) -> TreeLimits {
        self.limits
    }

    /// Tree of what `root` imports. A root with no entry yields a single leaf.
    pub fn build_dependent_tree(&self, root: &FileId, graph: &Graph) -> DependencyTree {
        self.traverse(root, |file| graph.edges(file).unwrap_or(&[]))
    }

    /// Tree of what imports `root`, following the reverse index.
    pub fn build_be_dependent_tree(&self, root: &FileId, reverse: &ReverseGraph) -> DependencyTree {
        self.traverse(root, |file| reverse.dependents(file).unwrap_or(&[]))
    }

    /// Build in either direction; inverts `graph` when the reverse tree is asked for.
    pub fn build(&self, direction: Direction, root: &FileId, graph: &Graph) -> DependencyTree {
        match direction {
            Direction::Dependent => self.build_dependent_tree(root, graph),
            Direction::BeDependent => self.build_be_dependent_tree(root, &graph.invert()),
        }
    }

    fn traverse<'a, F>(&self, root: &'a FileId, neighbors: F) -> DependencyTree
    where
        F: Fn(&FileId) -> &'a [FileId],
    {
        let mut traversal = Traversal {
            neighbors,
            limits: self.limits,
            path: vec![root],
            cycles: Vec::new(),
            node_count: 1,
            truncated: false,
        };
        let tree = traversal.expand(root);

        tracing::debug!(
            root = %root,
            nodes = traversal.node_count,
            cycles = traversal.cycles.len(),
            truncated = traversal.truncated,
            "built dependency tree"
        );

        DependencyTree {
            root: tree,
            cycles: traversal.cycles,
            truncated: traversal.truncated,
        }
    }
}

struct Traversal<'a, F> {
    neighbors: F,
    limits: TreeLimits,
    /// Ancestors of the node being expanded, root first, the node itself last.
    path: Vec<&'a FileId>,
    cycles: Vec<CycleEdge>,
    node_count: usize,
    truncated: bool,
}

impl<'a, F> Traversal<'a, F>
where
    F: Fn(&FileId) -> &'a [FileId],
{
    fn expand(&mut self, current: &'a FileId) -> TreeNode {
        let neighbors = (self.neighbors)(current);
        if neighbors.is_empty() {
            return TreeNode::leaf(current.clone());
        }
        // A node cut here is not expanded, so back-edges leaving it are not
        // listed in `cycles`; `truncated` is the only signal.
        if self.path.len() > self.limits.max_depth {
            self.truncated = true;
            return TreeNode::leaf(current.clone());
        }

        let mut children = Vec::new();
        let mut siblings: HashSet<&FileId> = HashSet::new();

        for next in neighbors {
            // Repeated imports of one file collapse into a single child.
            if !siblings.insert(next) {
                continue;
            }
            if self.node_count >= self.limits.max_nodes {
                self.truncated = true;
                break;
            }
            self.node_count += 1;

            if self.path.contains(&next) {
                self.cycles
                    .push(CycleEdge::new(current.clone(), next.clone()));
                children.push(TreeNode::leaf(next.clone()));
                continue;
            }

            self.path.push(next);
            let child = self.expand(next);
            self.path.pop();
            children.push(child);
        }

        TreeNode {
            name: current.clone(),
            children,
        }
    }
}
