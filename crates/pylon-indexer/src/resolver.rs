//! Import specifier resolution
//!
//! Order: relative (`./`, `../`), absolute, the alias table, tsconfig `paths`,
//! then `baseUrl`. Anything left is a bare package specifier and is dropped,
//! since `node_modules` sits outside the graph.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use pylon_core::{ResolutionMode, ResolveOptions, normalize_path};

use crate::tsconfig::ModuleConfig;

/// Extensions tried, in order, when a specifier names no existing file.
const JS_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "json"];
const TYPED_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "mts", "cts", "d.ts", "js", "jsx", "mjs", "cjs", "json",
];

/// Script extensions a typed project may write in place of the source's own.
const SCRIPT_SWAPS: &[(&str, &[&str])] = &[
    ("js", &["ts", "tsx"]),
    ("jsx", &["tsx"]),
    ("mjs", &["mts"]),
    ("cjs", &["cts"]),
];

#[derive(Debug, Clone)]
pub struct Resolver {
    mode: ResolutionMode,
    /// `(prefix, target)`, longest prefix first.
    aliases: Vec<(String, PathBuf)>,
    module_config: Option<ModuleConfig>,
}

impl Resolver {
    /// Build a resolver for one set of options. Reads the module config once.
    pub fn new(options: &ResolveOptions) -> Self {
        let module_config = options
            .module_config
            .as_deref()
            .and_then(ModuleConfig::load);
        if let Some(config) = &module_config {
            tracing::debug!(
                file = %config.file.display(),
                patterns = config.paths.len(),
                "using module resolution config"
            );
        }

        let mut aliases: Vec<(String, PathBuf)> = options
            .aliases
            .iter()
            .map(|(name, target)| {
                let prefix = name.trim_end_matches('*').trim_end_matches('/');
                let target = if target.is_absolute() {
                    target.clone()
                } else {
                    options.dictionary_root.join(target)
                };
                (prefix.to_string(), target)
            })
            .filter(|(prefix, _)| !prefix.is_empty())
            .collect();
        aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        Resolver {
            mode: options.mode,
            aliases,
            module_config,
        }
    }

    pub fn module_config(&self) -> Option<&ModuleConfig> {
        self.module_config.as_ref()
    }

    fn extensions(&self) -> &'static [&'static str] {
        match self.mode {
            ResolutionMode::Js => JS_EXTENSIONS,
            ResolutionMode::Typed => TYPED_EXTENSIONS,
        }
    }

    /// Resolve `specifier` as written in `importer` to an existing file.
    pub fn resolve(&self, importer: &Path, specifier: &str) -> Option<PathBuf> {
        let specifier = specifier
            .split(['?', '#'])
            .next()
            .unwrap_or(specifier);
        if specifier.is_empty() {
            return None;
        }

        if is_relative(specifier) {
            return self.probe(&importer.parent()?.join(specifier));
        }
        if specifier.starts_with('/') {
            return self.probe(Path::new(specifier));
        }

        if let Some(found) = self.resolve_alias(specifier) {
            return Some(found);
        }

        let config = self.module_config.as_ref()?;
        config
            .path_candidates(specifier)
            .iter()
            .find_map(|candidate| self.probe(candidate))
            .or_else(|| {
                config
                    .base_url_candidate(specifier)
                    .and_then(|candidate| self.probe(&candidate))
            })
    }

    fn resolve_alias(&self, specifier: &str) -> Option<PathBuf> {
        for (prefix, target) in &self.aliases {
            if specifier == prefix {
                return self.probe(target);
            }
            if let Some(rest) = specifier
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
            {
                return self.probe(&target.join(rest));
            }
        }
        None
    }

    /// The literal path, then each extension appended, then a swapped script
    /// extension (typed mode), then `index.*` inside a directory.
    fn probe(&self, path: &Path) -> Option<PathBuf> {
        let path = normalize_path(path);
        if path.is_file() {
            return Some(path);
        }

        for ext in self.extensions() {
            let candidate = with_appended_extension(&path, ext);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if self.mode == ResolutionMode::Typed {
            if let Some(found) = swap_script_extension(&path) {
                return Some(found);
            }
        }

        if path.is_dir() {
            for ext in self.extensions() {
                let index = path.join(format!("index.{ext}"));
                if index.is_file() {
                    return Some(index);
                }
            }
        }
        None
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// `a/b.service` + `ts` -> `a/b.service.ts`
fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

fn swap_script_extension(path: &Path) -> Option<PathBuf> {
    let ext = path.extension()?.to_str()?;
    let (_, replacements) = SCRIPT_SWAPS.iter().find(|(from, _)| *from == ext)?;
    replacements
        .iter()
        .map(|to| path.with_extension(to))
        .find(|candidate| candidate.is_file())
}
