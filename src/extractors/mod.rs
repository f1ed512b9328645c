// Language Extractors Module
//
// Tree-sitter based extractors. Each language turns one parsed file into the
// entities it defines (modules, types, functions, methods) and the scope that
// owns each of them.

pub mod base;
pub mod manager;
pub mod registry;

pub mod cpp;
pub mod python;
pub mod rust;

use thiserror::Error;

pub use base::{Entity, EntityKind, FileContext, LanguageRuleset, Owner};
pub use manager::{ExtractorManager, FileExtraction, ModuleInfo};
pub use registry::{LanguageExtractor, LanguageRegistry};

/// Per-file extraction failures. These skip the file, never the run.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8")]
    Encoding { path: String },

    #[error("failed to load {language} grammar: {message}")]
    Grammar { language: String, message: String },

    #[error("{language} parser produced no tree")]
    Parse { language: String },
}
