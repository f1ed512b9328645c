//! Snippet retrieval
//!
//! Resolves a fully-qualified name to the exact source lines that define it.
//! Lookup misses, incomplete graph entries and filesystem failures are all
//! encoded in the returned `CodeSnippet` (`found = false` plus a message); only
//! graph store failures surface as errors.

use crate::config::Config;
use crate::database::queries::FIND_DEFINITION;
use crate::database::{GraphStore, SqliteGraphStore, StoreError, row_str, row_u32};
use crate::utils::paths::is_contained_relative;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const NOT_FOUND_MESSAGE: &str = "Entity not found in graph.";
pub const MISSING_LOCATION_MESSAGE: &str = "Graph entry is missing location data.";

/// Source text of one entity plus where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSnippet {
    pub qualified_name: String,
    pub source_code: String,
    /// Repository-relative path the lines were read from
    pub file_path: String,
    /// 1-based, inclusive
    pub line_start: u32,
    /// 1-based, inclusive
    pub line_end: u32,
    pub docstring: Option<String>,
    pub found: bool,
    pub error_message: Option<String>,
}

impl Default for CodeSnippet {
    fn default() -> Self {
        Self {
            qualified_name: String::new(),
            source_code: String::new(),
            file_path: String::new(),
            line_start: 0,
            line_end: 0,
            docstring: None,
            found: true,
            error_message: None,
        }
    }
}

impl CodeSnippet {
    /// Empty result with `found = false`
    pub fn not_found(qualified_name: &str, message: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.to_string(),
            found: false,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Looks up definitions in a graph store and slices them out of the files under
/// `project_root`
pub struct SnippetRetriever<'a> {
    project_root: PathBuf,
    store: &'a dyn GraphStore,
}

impl<'a> SnippetRetriever<'a> {
    pub fn new(project_root: impl AsRef<Path>, store: &'a dyn GraphStore) -> Self {
        let root = project_root.as_ref();
        let project_root = root
            .canonicalize()
            .or_else(|_| std::path::absolute(root))
            .unwrap_or_else(|_| root.to_path_buf());
        Self { project_root, store }
    }

    /// Resolve `qualified_name` (exact match only) to its source lines
    pub fn find_snippet(&self, qualified_name: &str) -> Result<CodeSnippet, StoreError> {
        let rows = self
            .store
            .fetch_all(FIND_DEFINITION, &[("qualified_name", json!(qualified_name))])?;
        let Some(row) = rows.first() else {
            debug!("No graph entry for {}", qualified_name);
            return Ok(CodeSnippet::not_found(qualified_name, NOT_FOUND_MESSAGE));
        };

        let path = row_str(row, "path").filter(|p| !p.is_empty());
        let start = row_u32(row, "start_line").filter(|&line| line > 0);
        let end = row_u32(row, "end_line");
        let docstring = row_str(row, "docstring").map(str::to_string);

        // Only the path survives an unusable location; lines stay 0
        let (Some(path), Some(start), Some(end)) = (path, start, end) else {
            warn!("Graph entry for {} has no usable location", qualified_name);
            return Ok(CodeSnippet {
                file_path: path.unwrap_or_default().to_string(),
                docstring,
                ..CodeSnippet::not_found(qualified_name, MISSING_LOCATION_MESSAGE)
            });
        };
        if start > end {
            warn!(
                "Graph entry for {} has inverted range {}-{}",
                qualified_name, start, end
            );
            return Ok(CodeSnippet {
                file_path: path.to_string(),
                docstring,
                ..CodeSnippet::not_found(qualified_name, MISSING_LOCATION_MESSAGE)
            });
        }

        let mut snippet = CodeSnippet {
            qualified_name: qualified_name.to_string(),
            file_path: path.to_string(),
            line_start: start,
            line_end: end,
            docstring,
            ..CodeSnippet::default()
        };
        match self.read_lines(path, start, end) {
            Ok(source_code) => snippet.source_code = source_code,
            Err(message) => {
                warn!("Cannot read snippet for {}: {}", qualified_name, message);
                snippet.found = false;
                snippet.error_message = Some(message);
            }
        }
        Ok(snippet)
    }

    /// Lines `start..=end` (1-based) of `relative_path`, terminators preserved
    fn read_lines(&self, relative_path: &str, start: u32, end: u32) -> Result<String, String> {
        if !is_contained_relative(relative_path) {
            return Err(format!("Path '{relative_path}' escapes project root"));
        }

        let full_path = self.project_root.join(relative_path);
        let content = fs::read_to_string(&full_path)
            .map_err(|e| format!("Failed to read {}: {}", full_path.display(), e))?;

        let lines: Vec<&str> = content.split_inclusive('\n').collect();
        let from = (start as usize - 1).min(lines.len());
        let to = (end as usize).min(lines.len());
        if to < end as usize {
            warn!(
                "{} has {} lines; clamping requested range {}-{}",
                relative_path,
                lines.len(),
                start,
                end
            );
        }
        Ok(lines[from..to].concat())
    }
}

/// Resolve one name against the configured store, opened read-only for this call
pub fn find_snippet(
    config: &Config,
    qualified_name: &str,
    project_root: &Path,
) -> Result<CodeSnippet, StoreError> {
    let store = SqliteGraphStore::read_only_from_config(&config.store)?;
    SnippetRetriever::new(project_root, &store).find_snippet(qualified_name)
}
