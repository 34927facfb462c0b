//! Import extraction and resolution for JavaScript and TypeScript sources

pub mod coordinator;
pub mod discovery;
pub mod extractor;
pub mod languages;
pub mod parser_pool;
pub mod resolver;
pub mod source;
pub mod tsconfig;

#[cfg(test)]
pub mod tests;

pub use coordinator::{Activation, Indexer};
pub use discovery::discover_files;
pub use languages::{SourceLanguage, is_source_file};
pub use parser_pool::{ParseRequest, ParserPool, create_parser_pool};
pub use resolver::Resolver;
pub use source::ImportEdgeSource;
pub use tsconfig::ModuleConfig;
