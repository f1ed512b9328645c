//! LanguageRegistry - maps file extensions to language extractors
//!
//! Every supported language is a `LanguageExtractor` implementation. Shared
//! code only ever talks to the trait, so adding a language means registering
//! one more implementation.

use crate::extractors::ExtractError;
use crate::extractors::base::{Entity, FileContext};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tree_sitter::{Parser, Tree};

/// Parsing and entity-extraction capability for one language
pub trait LanguageExtractor: Send + Sync {
    /// Lower-case language identifier, e.g. "python"
    fn name(&self) -> &'static str;

    /// File extensions (without the dot) handled by this language
    fn extensions(&self) -> &'static [&'static str];

    fn tree_sitter_language(&self) -> tree_sitter::Language;

    /// Qualified name of the module a file defines
    fn module_name(&self, relative_path: &str, project_name: &str) -> String;

    /// Entities defined at top level or nested within types
    fn extract(&self, context: &FileContext, tree: &Tree) -> Vec<Entity>;

    /// Parse source text into a syntax tree
    fn parse(&self, content: &str) -> Result<Tree, ExtractError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.tree_sitter_language())
            .map_err(|e| ExtractError::Grammar {
                language: self.name().to_string(),
                message: e.to_string(),
            })?;

        parser.parse(content, None).ok_or_else(|| ExtractError::Parse {
            language: self.name().to_string(),
        })
    }
}

/// Registry of language extractors keyed by file extension
#[derive(Clone, Default)]
pub struct LanguageRegistry {
    by_extension: BTreeMap<String, Arc<dyn LanguageExtractor>>,
}

impl LanguageRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in language
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::extractors::python::PythonExtractor::new()));
        registry.register(Arc::new(crate::extractors::cpp::CppExtractor::new()));
        registry.register(Arc::new(crate::extractors::rust::RustExtractor::new()));
        registry
    }

    /// Add (or replace) a language; its extensions take precedence over earlier registrations
    pub fn register(&mut self, extractor: Arc<dyn LanguageExtractor>) {
        for ext in extractor.extensions() {
            self.by_extension.insert(ext.to_ascii_lowercase(), Arc::clone(&extractor));
        }
    }

    /// Keep only the named languages. An empty list keeps everything.
    pub fn restrict_to(&mut self, languages: &[String]) {
        if languages.is_empty() {
            return;
        }
        self.by_extension.retain(|_, extractor| {
            languages
                .iter()
                .any(|l| l.eq_ignore_ascii_case(extractor.name()))
        });
    }

    /// Detect the language of a file from its extension
    pub fn for_path(&self, path: &Path) -> Option<Arc<dyn LanguageExtractor>> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.by_extension.get(&ext).cloned()
    }

    /// Registered language names, sorted and de-duplicated
    pub fn supported_languages(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.by_extension.values().map(|e| e.name()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.by_extension.is_empty()
    }
}

impl std::fmt::Debug for LanguageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageRegistry")
            .field("extensions", &self.by_extension.keys().collect::<Vec<_>>())
            .finish()
    }
}
