//! Source file discovery for full rebuilds

use std::path::Path;

use globset::GlobSet;
use ignore::WalkBuilder;
use pylon_core::FileId;

use crate::languages::is_source_file;

/// Every recognized source file under `root`, sorted.
///
/// `.gitignore` rules are honored and paths matching `exclude` are skipped,
/// directories included, so excluded trees are never descended into.
pub fn discover_files(root: &Path, exclude: &GlobSet) -> Vec<FileId> {
    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(true)
        .parents(true)
        .require_git(false)
        .follow_links(false);

    let exclude = exclude.clone();
    builder.filter_entry(move |entry| !exclude.is_match(entry.path()));

    let mut files: Vec<FileId> = builder
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .filter(|entry| is_source_file(entry.path()))
        .map(|entry| FileId::new(entry.path()))
        .collect();

    files.sort();
    files.dedup();
    tracing::debug!(root = %root.display(), files = files.len(), "discovered source files");
    files
}
