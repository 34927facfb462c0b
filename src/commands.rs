//! CLI command implementations

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use pylon_core::{Config, ConfigOverrides, Direction, RebuildOutcome};
use pylon_indexer::{Activation, Indexer};
use pylon_server::handlers::TreeResponse;
use pylon_server::{PylonServer, ServerConfig};
use pylon_watcher::WatcherService;

use crate::output;

fn open_indexer(root: &Path, overrides: ConfigOverrides) -> anyhow::Result<Indexer> {
    let config = Config::load_with(root, overrides)
        .with_context(|| format!("cannot load configuration for {}", root.display()))?;
    if let Some(file) = &config.source {
        tracing::debug!("using config file {}", file.display());
    }
    Ok(Indexer::new(config)?)
}

/// Load from cache, or rebuild when there is none. Failures are logged.
async fn activate(indexer: &Indexer) -> anyhow::Result<()> {
    match indexer.activate().await? {
        Activation::FromCache { files } => {
            tracing::info!("loaded {files} files from {}", indexer.store().cache_path().display());
        }
        Activation::Rebuilt { status, outcome } => {
            tracing::info!("indexed {} files ({status:?} cache)", outcome.files);
            report(&outcome);
        }
    }
    Ok(())
}

fn report(outcome: &RebuildOutcome) {
    for failure in &outcome.failures {
        tracing::warn!("{failure}");
    }
    if let Some(reason) = &outcome.persistence_failure {
        tracing::warn!("graph cache not saved, the next run will rebuild: {reason}");
    }
}

pub async fn index(root: &Path, overrides: ConfigOverrides, force: bool) -> anyhow::Result<()> {
    let indexer = open_indexer(root, overrides)?;
    if force {
        let outcome = indexer.rebuild().await?;
        report(&outcome);
        println!("indexed {} files, {} failed", outcome.files, outcome.failures.len());
    } else {
        activate(&indexer).await?;
        println!("{} files in graph", indexer.snapshot().await.len());
    }
    Ok(())
}

pub async fn tree(
    root: &Path,
    overrides: ConfigOverrides,
    file: &Path,
    direction: Direction,
    json: bool,
) -> anyhow::Result<()> {
    let indexer = open_indexer(root, overrides)?;
    activate(&indexer).await?;

    let tree = indexer.tree(file, direction).await;
    if json {
        let payload = TreeResponse {
            root: tree.root,
            root_path: indexer.root_path().to_string_lossy().into_owned(),
            cycles: tree.cycles,
            truncated: tree.truncated,
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print!("{}", output::render_tree(&tree, indexer.root_path()));
    }
    Ok(())
}

pub async fn cycles(root: &Path, overrides: ConfigOverrides, json: bool) -> anyhow::Result<()> {
    let indexer = open_indexer(root, overrides)?;
    activate(&indexer).await?;

    let groups = indexer.cycle_groups().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
    } else {
        print!("{}", output::render_cycle_groups(&groups, indexer.root_path()));
    }
    Ok(())
}

pub async fn clear(root: &Path, overrides: ConfigOverrides) -> anyhow::Result<()> {
    let indexer = open_indexer(root, overrides)?;
    if indexer.clear_cache().await? {
        println!("removed {}", indexer.store().cache_path().display());
    } else {
        println!("no cache at {}", indexer.store().cache_path().display());
    }
    Ok(())
}

pub async fn serve(
    root: &Path,
    overrides: ConfigOverrides,
    host: String,
    port: u16,
    open: bool,
    watch: bool,
) -> anyhow::Result<()> {
    let indexer = Arc::new(open_indexer(root, overrides)?);
    activate(&indexer).await?;

    if watch {
        let mut watcher = WatcherService::new(Arc::clone(&indexer))?;
        watcher.start_watching()?;
        tokio::spawn(async move {
            watcher.process_events().await;
        });
    }

    let config = ServerConfig { host, port };
    if open {
        let url = config.url();
        if let Err(e) = open::that(&url) {
            tracing::warn!("could not open {url}: {e}");
        }
    }

    PylonServer::new(indexer, config).start().await
}
