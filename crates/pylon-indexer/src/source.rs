//! The tree-sitter backed EdgeSource

use std::path::Path;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use pylon_core::{AnalysisError, AnalysisFailure, EdgeSet, EdgeSource, FileId, ResolveOptions};

use crate::languages::SourceLanguage;
use crate::parser_pool::{ParseRequest, ParserPool, create_parser_pool};
use crate::resolver::Resolver;

/// Reads a file, extracts its import specifiers and resolves them to files.
///
/// Unresolvable specifiers (bare packages, missing files) produce no edge.
#[derive(Debug, Clone)]
pub struct ImportEdgeSource {
    pool: ParserPool,
    /// Files analyzed at once during a bulk rebuild.
    concurrency: usize,
}

impl Default for ImportEdgeSource {
    fn default() -> Self {
        ImportEdgeSource::new(create_parser_pool())
    }
}

impl ImportEdgeSource {
    pub fn new(pool: ParserPool) -> Self {
        let concurrency = pool.workers() * 4;
        ImportEdgeSource { pool, concurrency }
    }

    async fn analyze_with(&self, file: &FileId, resolver: &Resolver) -> Result<EdgeSet, AnalysisError> {
        let path = file.as_path();
        let language = SourceLanguage::from_path(path)
            .ok_or_else(|| AnalysisError::Unsupported(file.to_string()))?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AnalysisError::Unreadable(e.to_string()))?;
        let content = String::from_utf8(bytes).map_err(|_| AnalysisError::NotUtf8)?;

        let specifiers = self
            .pool
            .parse(ParseRequest {
                language,
                content,
                path: path.to_path_buf(),
            })
            .await?;

        Ok(resolve_all(resolver, path, &specifiers))
    }
}

fn resolve_all(resolver: &Resolver, importer: &Path, specifiers: &[String]) -> EdgeSet {
    specifiers
        .iter()
        .filter_map(|specifier| match resolver.resolve(importer, specifier) {
            Some(target) => Some(FileId::new(target)),
            None => {
                tracing::trace!(importer = %importer.display(), specifier = %specifier, "unresolved import");
                None
            }
        })
        .collect()
}

#[async_trait]
impl EdgeSource for ImportEdgeSource {
    async fn analyze(&self, file: &FileId, options: &ResolveOptions) -> Result<EdgeSet, AnalysisError> {
        let resolver = Resolver::new(options);
        self.analyze_with(file, &resolver).await
    }

    async fn analyze_all(
        &self,
        files: &[FileId],
        options: &ResolveOptions,
    ) -> Vec<Result<EdgeSet, AnalysisFailure>> {
        let resolver = Resolver::new(options);
        let resolver = &resolver;

        stream::iter(files.iter().cloned())
            .map(|file| async move {
                self.analyze_with(&file, resolver)
                    .await
                    .map_err(|error| AnalysisFailure { file, error })
            })
            .buffered(self.concurrency.max(1))
            .collect()
            .await
    }
}
