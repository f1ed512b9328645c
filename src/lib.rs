// codegraph - structural code graph library
//!
//! Parses a repository into a graph of modules, types, functions and methods,
//! stores it, and resolves fully-qualified names back to exact source lines.
//!
//! Write path: `walker` -> `extractors` -> `ingest` -> `database`.
//! Read path: `retrieval` (and `query` for free-form questions) -> `database`.

pub mod config;
pub mod database;
pub mod extractors;
pub mod ingest;
pub mod query;
pub mod retrieval;
pub mod utils;
pub mod walker;

#[cfg(test)]
pub mod tests;

// Re-export common types
pub use config::Config;
pub use database::{GraphStore, SqliteGraphStore, StoreError};
pub use extractors::{Entity, EntityKind, LanguageExtractor, LanguageRegistry};
pub use ingest::{GraphIngestor, IngestError, IngestReport, ingest_repository};
pub use query::{CommandTranslator, GraphQuestions, QueryAnswer, QueryTranslator};
pub use retrieval::{CodeSnippet, SnippetRetriever, find_snippet};
