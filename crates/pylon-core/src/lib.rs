//! Pylon Core: import graph, reverse index, tree builder and graph store

pub mod cache;
pub mod config;
pub mod cycles;
pub mod error;
pub mod events;
pub mod graph;
pub mod model;
pub mod reverse;
pub mod source;
pub mod store;
pub mod tree;
pub mod workspace;


#[cfg(test)]
pub mod test_utils;

pub use cache::{CACHE_DIR, CACHE_SUFFIX, cache_file_name, clear_cache, graph_cache_path, load_graph, save_graph};
pub use config::{CONFIG_FILES, Config, ConfigOverrides};
pub use cycles::{CycleGroup, find_cycle_groups};
pub use error::{AnalysisError, AnalysisFailure, ConfigError, StoreError};
pub use events::{GraphEvent, GraphEventKind};
pub use graph::Graph;
pub use model::{CycleEdge, DependencyTree, EdgeSet, FileId, TreeNode, normalize_path};
pub use reverse::{ReverseGraph, invert};
pub use source::{EdgeSource, ResolutionMode, ResolveOptions};
pub use store::{GraphStore, LoadStatus, RebuildOutcome};
pub use tree::{Direction, TreeBuilder, TreeLimits};
pub use workspace::{Workspace, WorkspaceKind};
