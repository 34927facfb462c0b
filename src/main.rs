//! Pylon CLI entry point

use clap::{Parser, Subcommand};
use pylon_core::{ConfigOverrides, ResolutionMode};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "pylon")]
#[command(about = "Module import graph with dependency trees and cycle detection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Workspace root (defaults to current directory)
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// Directory scanned on rebuild, relative to the workspace root
    #[arg(long, global = true)]
    analysis_root: Option<PathBuf>,

    /// tsconfig.json / jsconfig.json, or the directory holding one
    #[arg(long, global = true)]
    module_config: Option<PathBuf>,

    /// Resolution mode: `js` or `typed`
    #[arg(long, global = true)]
    mode: Option<ResolutionMode>,

    /// Maximum tree depth
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// Maximum number of tree nodes
    #[arg(long, global = true)]
    max_nodes: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the cache or rebuild the import graph, then exit
    Index {
        /// Rebuild even when a cache exists
        #[arg(short, long)]
        force: bool,
    },
    /// Show what a file depends on
    Deps {
        file: PathBuf,
        /// Print the tree payload as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what depends on a file
    Rdeps {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List groups of files that import each other
    Cycles {
        #[arg(long)]
        json: bool,
    },
    /// Delete the cache file
    Clear,
    /// Start the tree viewer
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "7890")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Do not patch the graph on file saves
        #[arg(long)]
        no_watch: bool,
    },
    /// Show version
    Version,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            analysis_root: self.analysis_root.clone(),
            module_config: self.module_config.clone(),
            mode: self.mode,
            cache_dir: None,
            max_depth: self.max_depth,
            max_nodes: self.max_nodes,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output stays clean
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("pylon={log_level}")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let overrides = cli.overrides();
    let root = cli.root;

    match cli.command {
        Commands::Index { force } => commands::index(&root, overrides, force).await,
        Commands::Deps { file, json } => {
            commands::tree(&root, overrides, &file, pylon_core::Direction::Dependent, json).await
        }
        Commands::Rdeps { file, json } => {
            commands::tree(&root, overrides, &file, pylon_core::Direction::BeDependent, json).await
        }
        Commands::Cycles { json } => commands::cycles(&root, overrides, json).await,
        Commands::Clear => commands::clear(&root, overrides).await,
        Commands::Serve {
            port,
            host,
            open,
            no_watch,
        } => commands::serve(&root, overrides, host, port, open, !no_watch).await,
        Commands::Version => {
            println!("pylon v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
