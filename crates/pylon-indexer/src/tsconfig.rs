//! `tsconfig.json` / `jsconfig.json` module resolution settings
//!
//! Only `compilerOptions.baseUrl` and `compilerOptions.paths` are read. Both
//! files are JSON with comments and trailing commas allowed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use pylon_core::normalize_path;

/// File names probed when the configured location is a directory.
pub const CONFIG_NAMES: [&str; 2] = ["tsconfig.json", "jsconfig.json"];

/// One `paths` entry, targets already absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    pub pattern: String,
    pub targets: Vec<PathBuf>,
}

impl PathMapping {
    /// The part of `specifier` matched by `*`, or `""` for an exact pattern.
    fn capture<'s>(&self, specifier: &'s str) -> Option<&'s str> {
        match self.pattern.split_once('*') {
            Some((prefix, suffix)) => specifier
                .strip_prefix(prefix)?
                .strip_suffix(suffix)
                .filter(|_| specifier.len() >= prefix.len() + suffix.len()),
            None if self.pattern == specifier => Some(""),
            None => None,
        }
    }

    fn prefix_len(&self) -> usize {
        self.pattern.split('*').next().map_or(0, str::len)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleConfig {
    /// The file the settings came from.
    pub file: PathBuf,
    pub base_url: Option<PathBuf>,
    /// Most specific pattern first.
    pub paths: Vec<PathMapping>,
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(rename = "compilerOptions")]
    compiler_options: Option<CompilerOptions>,
}

#[derive(Deserialize)]
struct CompilerOptions {
    #[serde(rename = "baseUrl")]
    base_url: Option<String>,
    paths: Option<HashMap<String, Vec<String>>>,
}

impl ModuleConfig {
    /// Load from a config file, or from the first of [`CONFIG_NAMES`] inside a
    /// directory. A missing or unreadable config is `None`.
    pub fn load(location: &Path) -> Option<ModuleConfig> {
        let file = if location.is_dir() {
            CONFIG_NAMES
                .iter()
                .map(|name| location.join(name))
                .find(|path| path.is_file())?
        } else {
            location.to_path_buf()
        };

        let content = std::fs::read_to_string(&file).ok()?;
        match ModuleConfig::parse(&content, &file) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %file.display(), "ignoring module config: {e}");
                None
            }
        }
    }

    /// Parse `content` as if read from `file`; relative paths resolve against
    /// the file's directory.
    pub fn parse(content: &str, file: &Path) -> Result<ModuleConfig, serde_json::Error> {
        let clean = strip_trailing_commas(&strip_json_comments(content));
        let raw: RawConfig = serde_json::from_str(&clean)?;
        let dir = file.parent().unwrap_or(Path::new("/"));

        let Some(options) = raw.compiler_options else {
            return Ok(ModuleConfig {
                file: file.to_path_buf(),
                ..Default::default()
            });
        };

        let base_url = options.base_url.map(|base| normalize_path(&dir.join(base)));
        let paths_base = base_url.as_deref().unwrap_or(dir);

        let mut paths: Vec<PathMapping> = options
            .paths
            .unwrap_or_default()
            .into_iter()
            .map(|(pattern, targets)| PathMapping {
                pattern,
                targets: targets
                    .iter()
                    .map(|target| paths_base.join(target))
                    .collect(),
            })
            .collect();
        paths.sort_by(|a, b| {
            b.prefix_len()
                .cmp(&a.prefix_len())
                .then_with(|| a.pattern.cmp(&b.pattern))
        });

        Ok(ModuleConfig {
            file: file.to_path_buf(),
            base_url,
            paths,
        })
    }

    /// Candidate locations from the most specific matching `paths` pattern.
    pub fn path_candidates(&self, specifier: &str) -> Vec<PathBuf> {
        for mapping in &self.paths {
            if let Some(captured) = mapping.capture(specifier) {
                return mapping
                    .targets
                    .iter()
                    .map(|target| {
                        let target = target.to_string_lossy();
                        normalize_path(Path::new(&target.replacen('*', captured, 1)))
                    })
                    .collect();
            }
        }
        Vec::new()
    }

    /// `baseUrl/<specifier>`, when a base URL is set.
    pub fn base_url_candidate(&self, specifier: &str) -> Option<PathBuf> {
        self.base_url
            .as_ref()
            .map(|base| normalize_path(&base.join(specifier)))
    }
}

/// Remove `//` and `/* */` comments outside string literals.
fn strip_json_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        let next = chars.peek().copied();
        match (c, next) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut previous = '\0';
                for skipped in chars.by_ref() {
                    if previous == '*' && skipped == '/' {
                        break;
                    }
                    previous = skipped;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Drop commas that directly precede `}` or `]`, ignoring whitespace.
fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(&escaped) = chars.get(i + 1) {
                    out.push(escaped);
                    i += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
            out.push(c);
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if !matches!(next, Some('}') | Some(']')) {
                out.push(c);
            }
        } else {
            out.push(c);
        }
        i += 1;
    }
    out
}
