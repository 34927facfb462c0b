//! Configuration discovery and validation
//!
//! Precedence, lowest first: built-in defaults, the first config file found in
//! the workspace root, then command-line overrides. Files are never merged with
//! each other.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;

use crate::cache::{self, CACHE_DIR};
use crate::error::ConfigError;
use crate::model::normalize_path;
use crate::source::{ResolutionMode, ResolveOptions};
use crate::tree::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_NODES, TreeBuilder, TreeLimits};
use crate::workspace::{Workspace, WorkspaceKind};

/// Config file names, in lookup order.
pub const CONFIG_FILES: [&str; 4] = ["pylon.toml", "pylon.yaml", "pylon.yml", "pylon.json"];

pub const DEFAULT_EXCLUDES: [&str; 2] = ["**/node_modules/**", "**/.git/**"];

/// Shape of a config file. Every field is optional; camelCase keys from
/// editor settings are accepted as aliases.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    #[serde(alias = "dictionaryPath")]
    analysis_root: Option<PathBuf>,
    #[serde(alias = "tsConfigPath")]
    module_config: Option<PathBuf>,
    mode: Option<ResolutionMode>,
    #[serde(alias = "isJs")]
    is_js: Option<bool>,
    #[serde(alias = "alias")]
    aliases: Option<BTreeMap<String, PathBuf>>,
    exclude: Option<Vec<String>>,
    cache_dir: Option<PathBuf>,
    max_depth: Option<usize>,
    max_nodes: Option<usize>,
}

/// Values supplied on the command line. `None` leaves the lower layer in place.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub analysis_root: Option<PathBuf>,
    pub module_config: Option<PathBuf>,
    pub mode: Option<ResolutionMode>,
    pub cache_dir: Option<PathBuf>,
    pub max_depth: Option<usize>,
    pub max_nodes: Option<usize>,
}

/// Validated configuration. All paths are absolute.
#[derive(Debug, Clone)]
pub struct Config {
    pub workspace: Workspace,
    pub analysis_root: PathBuf,
    pub module_config: PathBuf,
    pub mode: ResolutionMode,
    pub aliases: BTreeMap<String, PathBuf>,
    pub exclude: Vec<String>,
    pub cache_dir: PathBuf,
    pub limits: TreeLimits,
    /// The config file that was read, if any.
    pub source: Option<PathBuf>,
}

impl Config {
    pub fn load(root: &Path) -> Result<Config, ConfigError> {
        Config::load_with(root, ConfigOverrides::default())
    }

    pub fn load_with(root: &Path, overrides: ConfigOverrides) -> Result<Config, ConfigError> {
        let workspace = Workspace::detect(root)?;
        let source = find_config_file(&workspace.root);
        let raw = match &source {
            Some(path) => read_config_file(path)?,
            None => RawConfig::default(),
        };

        let resolve = |path: PathBuf| -> PathBuf {
            if path.is_absolute() {
                normalize_path(&path)
            } else {
                normalize_path(&workspace.root.join(path))
            }
        };

        let file_mode = raw.mode.or(raw.is_js.map(|is_js| {
            if is_js {
                ResolutionMode::Js
            } else {
                ResolutionMode::Typed
            }
        }));

        let aliases = raw
            .aliases
            .unwrap_or_default()
            .into_iter()
            .map(|(name, path)| {
                if name.is_empty() || path.as_os_str().is_empty() {
                    Err(ConfigError::EmptyAlias(name))
                } else {
                    Ok((name, resolve(path)))
                }
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        let config = Config {
            analysis_root: resolve(
                overrides
                    .analysis_root
                    .or(raw.analysis_root)
                    .unwrap_or_else(|| PathBuf::from(".")),
            ),
            module_config: resolve(
                overrides
                    .module_config
                    .or(raw.module_config)
                    .unwrap_or_else(|| PathBuf::from(".")),
            ),
            mode: overrides
                .mode
                .or(file_mode)
                .or(workspace.kind.map(WorkspaceKind::default_mode))
                .unwrap_or_default(),
            aliases,
            exclude: raw
                .exclude
                .unwrap_or_else(|| DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect()),
            cache_dir: resolve(
                overrides
                    .cache_dir
                    .or(raw.cache_dir)
                    .unwrap_or_else(|| PathBuf::from(CACHE_DIR)),
            ),
            limits: TreeLimits {
                max_depth: overrides.max_depth.or(raw.max_depth).unwrap_or(DEFAULT_MAX_DEPTH),
                max_nodes: overrides.max_nodes.or(raw.max_nodes).unwrap_or(DEFAULT_MAX_NODES),
            },
            workspace,
            source,
        };
        config.validate()?;

        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.analysis_root.is_dir() {
            return Err(ConfigError::MissingAnalysisRoot(self.analysis_root.clone()));
        }
        if self.limits.max_depth == 0 {
            return Err(ConfigError::ZeroLimit("max_depth"));
        }
        if self.limits.max_nodes == 0 {
            return Err(ConfigError::ZeroLimit("max_nodes"));
        }
        self.exclude_set()?;
        Ok(())
    }

    /// Options for every EdgeSource call made under this config.
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            dictionary_root: self.analysis_root.clone(),
            module_config: Some(self.module_config.clone()),
            mode: self.mode,
            aliases: self.aliases.clone(),
        }
    }

    /// Compiled exclude patterns.
    pub fn exclude_set(&self) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidGlob {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|e| ConfigError::InvalidGlob {
            pattern: self.exclude.join(", "),
            reason: e.to_string(),
        })
    }

    pub fn cache_path(&self) -> PathBuf {
        cache::graph_cache_path(&self.cache_dir, &self.workspace.name)
    }

    pub fn tree_builder(&self) -> TreeBuilder {
        TreeBuilder::new(self.limits)
    }
}

/// First existing config file in `root`, in [`CONFIG_FILES`] order.
pub fn find_config_file(root: &Path) -> Option<PathBuf> {
    CONFIG_FILES
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

fn read_config_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_error = |reason: String| ConfigError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
        Some("yaml") | Some("yml") => {
            // An empty YAML document is an empty config
            if content.trim().is_empty() {
                return Ok(RawConfig::default());
            }
            serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))
        }
        _ => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string())),
    }
}
