//! ExtractorManager - turns one discovered source file into its entities
//!
//! Reads the file, parses it with the language's grammar and delegates to the
//! language extractor. Failures are returned per file so the caller can log
//! and skip without aborting the run.

use crate::extractors::ExtractError;
use crate::extractors::base::{Entity, FileContext};
use crate::walker::SourceFile;
use std::fs;
use tracing::{debug, warn};

/// The module node a file contributes to the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub qualified_name: String,
    /// Repository-relative, Unix-style path
    pub path: String,
    pub language: String,
    pub line_count: u32,
}

/// Everything extracted from a single file
#[derive(Debug, Clone)]
pub struct FileExtraction {
    pub module: ModuleInfo,
    pub entities: Vec<Entity>,
    /// The syntax tree contained error nodes; entities are best-effort
    pub had_syntax_errors: bool,
}

/// Stateless front door for per-file extraction
pub struct ExtractorManager {
    project_name: String,
}

impl ExtractorManager {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
        }
    }

    /// Read, parse and extract a single file
    pub fn extract_file(&self, file: &SourceFile) -> Result<FileExtraction, ExtractError> {
        let bytes = fs::read(&file.absolute_path).map_err(|source| ExtractError::Read {
            path: file.relative_path.clone(),
            source,
        })?;
        let content = String::from_utf8(bytes).map_err(|_| ExtractError::Encoding {
            path: file.relative_path.clone(),
        })?;

        self.extract_content(file, content)
    }

    /// Parse and extract already-loaded content
    pub fn extract_content(
        &self,
        file: &SourceFile,
        content: String,
    ) -> Result<FileExtraction, ExtractError> {
        let language = &file.language;
        let tree = language.parse(&content)?;
        let had_syntax_errors = tree.root_node().has_error();
        if had_syntax_errors {
            warn!(
                "Syntax errors in {} - extracting what the {} parser recovered",
                file.relative_path,
                language.name()
            );
        }

        let context = FileContext {
            relative_path: file.relative_path.clone(),
            module_name: language.module_name(&file.relative_path, &self.project_name),
            content,
        };

        let entities = language.extract(&context, &tree);
        debug!(
            "Extracted {} entities from {} file: {}",
            entities.len(),
            language.name(),
            file.relative_path
        );

        let line_count = context.content.lines().count().max(1) as u32;
        Ok(FileExtraction {
            module: ModuleInfo {
                qualified_name: context.module_name,
                path: file.relative_path.clone(),
                language: language.name().to_string(),
                line_count,
            },
            entities,
            had_syntax_errors,
        })
    }
}
