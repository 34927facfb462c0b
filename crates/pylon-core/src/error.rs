//! Error types for graph storage, analysis and configuration

use std::path::PathBuf;

use thiserror::Error;

use crate::model::FileId;

/// Why an EdgeSource could not produce edges for one file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("cannot read source: {0}")]
    Unreadable(String),

    #[error("source is not valid UTF-8")]
    NotUtf8,

    #[error("parse failed: {0}")]
    Parse(String),

    #[error("unsupported file type: {0}")]
    Unsupported(String),

    #[error("analysis worker unavailable")]
    WorkerUnavailable,
}

/// A single file whose analysis failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{file}: {error}")]
pub struct AnalysisFailure {
    pub file: FileId,
    pub error: AnalysisError,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The cache file exists but is not a well-formed graph. It has been deleted.
    #[error("corrupt cache file {path}: {reason}")]
    CorruptCache { path: PathBuf, reason: String },

    #[error("cannot read cache file {path}: {source}")]
    CacheUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the cache failed; the in-memory graph is still current.
    #[error("failed to persist graph to {path}: {reason}")]
    PersistenceFailed { path: PathBuf, reason: String },

    #[error("analysis failed for {0}")]
    Analysis(#[from] AnalysisFailure),

    #[error("file discovery failed: {0}")]
    Discovery(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("workspace root {path} is not accessible: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("analysis root {0} is not a directory")]
    MissingAnalysisRoot(PathBuf),

    #[error("alias `{0}` is empty")]
    EmptyAlias(String),

    #[error("invalid exclude pattern `{pattern}`: {reason}")]
    InvalidGlob { pattern: String, reason: String },

    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),

    #[error("unknown resolution mode `{0}`")]
    UnknownMode(String),
}
