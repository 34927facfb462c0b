//! Recognized source languages

use std::path::Path;

use tree_sitter::Language;

/// Languages whose files take part in the import graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceLanguage {
    /// `.js`, `.jsx`, `.mjs`, `.cjs`
    JavaScript,
    /// `.ts`, `.mts`, `.cts`
    TypeScript,
    /// `.tsx`
    Tsx,
}

impl SourceLanguage {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "js" | "jsx" | "mjs" | "cjs" => Some(SourceLanguage::JavaScript),
            "ts" | "mts" | "cts" => Some(SourceLanguage::TypeScript),
            "tsx" => Some(SourceLanguage::Tsx),
            _ => None,
        }
    }

    /// Tree-sitter grammar for this language.
    pub fn grammar(&self) -> Language {
        match self {
            SourceLanguage::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            SourceLanguage::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            SourceLanguage::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SourceLanguage::JavaScript => "javascript",
            SourceLanguage::TypeScript => "typescript",
            SourceLanguage::Tsx => "tsx",
        }
    }
}

/// Whether `path` has a recognized source extension. Declaration files
/// (`.d.ts`) are not sources.
pub fn is_source_file(path: &Path) -> bool {
    let is_declaration = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".d.ts") || n.ends_with(".d.mts") || n.ends_with(".d.cts"));
    !is_declaration && SourceLanguage::from_path(path).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognizes_extensions() {
        assert_eq!(SourceLanguage::from_path(Path::new("a/b.mjs")), Some(SourceLanguage::JavaScript));
        assert_eq!(SourceLanguage::from_path(Path::new("a/b.jsx")), Some(SourceLanguage::JavaScript));
        assert_eq!(SourceLanguage::from_path(Path::new("a/b.cts")), Some(SourceLanguage::TypeScript));
        assert_eq!(SourceLanguage::from_path(Path::new("a/b.tsx")), Some(SourceLanguage::Tsx));
        assert_eq!(SourceLanguage::from_path(Path::new("a/b.rs")), None);
        assert_eq!(SourceLanguage::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_declarations_are_not_sources() {
        assert!(is_source_file(Path::new("/w/src/app.ts")));
        assert!(!is_source_file(Path::new("/w/src/env.d.ts")));
        assert!(!is_source_file(Path::new("/w/styles.css")));
    }
}
