//! The seam between the graph store and import analysis

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisFailure, ConfigError};
use crate::model::{EdgeSet, FileId};

/// How import specifiers are resolved to files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMode {
    /// Plain JavaScript: `.js`-family extensions are tried first.
    #[default]
    Js,
    /// Type-checked sources: `.ts`-family extensions are tried first.
    Typed,
}

impl std::str::FromStr for ResolutionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "js" | "javascript" => Ok(ResolutionMode::Js),
            "typed" | "ts" | "typescript" => Ok(ResolutionMode::Typed),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

/// Options handed to every [`EdgeSource`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Directory whose files make up the graph.
    pub dictionary_root: PathBuf,
    /// `tsconfig.json`/`jsconfig.json`, or a directory holding one.
    pub module_config: Option<PathBuf>,
    pub mode: ResolutionMode,
    /// Specifier prefix to absolute path.
    pub aliases: BTreeMap<String, PathBuf>,
}

/// Produces the direct import targets of a file.
#[async_trait]
pub trait EdgeSource: Send + Sync {
    async fn analyze(&self, file: &FileId, options: &ResolveOptions) -> Result<EdgeSet, AnalysisError>;

    /// Analyze many files. Results come back in input order, one per file.
    async fn analyze_all(
        &self,
        files: &[FileId],
        options: &ResolveOptions,
    ) -> Vec<Result<EdgeSet, AnalysisFailure>> {
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            let result = self
                .analyze(file, options)
                .await
                .map_err(|error| AnalysisFailure {
                    file: file.clone(),
                    error,
                });
            results.push(result);
        }
        results
    }
}
