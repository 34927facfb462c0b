//! Workspace detection

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::source::ResolutionMode;

/// Project flavor, from marker files at the workspace root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceKind {
    /// `tsconfig.json`
    TypeScript,
    /// `jsconfig.json`
    JavaScript,
    /// `package.json` only
    Npm,
}

impl WorkspaceKind {
    pub fn detect(root: &Path) -> Option<WorkspaceKind> {
        if root.join("tsconfig.json").exists() {
            Some(WorkspaceKind::TypeScript)
        } else if root.join("jsconfig.json").exists() {
            Some(WorkspaceKind::JavaScript)
        } else if root.join("package.json").exists() {
            Some(WorkspaceKind::Npm)
        } else {
            None
        }
    }

    /// Resolution mode used when neither a config file nor the command line sets one.
    pub fn default_mode(self) -> ResolutionMode {
        match self {
            WorkspaceKind::TypeScript => ResolutionMode::Typed,
            WorkspaceKind::JavaScript | WorkspaceKind::Npm => ResolutionMode::Js,
        }
    }
}

/// The directory a graph belongs to. One graph per workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Canonical absolute root.
    pub root: PathBuf,
    /// Directory name, used to name the cache file.
    pub name: String,
    pub kind: Option<WorkspaceKind>,
}

impl Workspace {
    pub fn detect(root: &Path) -> Result<Workspace, ConfigError> {
        let root = root.canonicalize().map_err(|source| ConfigError::Workspace {
            path: root.to_path_buf(),
            source,
        })?;
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "workspace".to_string());
        let kind = WorkspaceKind::detect(&root);

        Ok(Workspace { root, name, kind })
    }
}
