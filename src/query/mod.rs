//! Free-form questions against the graph
//!
//! A `QueryTranslator` turns a natural-language question into a read query.
//! The translator is an external collaborator; this module only cleans and
//! validates what it returns and runs the query on a read-only store.

use crate::config::TranslatorConfig;
use crate::database::{GraphStore, Row, StoreError};
use regex::Regex;
use serde::Serialize;
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info};

static CODE_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)\r?\n?```$").unwrap()
});

/// Environment variables set for the translator command
pub const SCHEMA_ENV_VAR: &str = "CODEGRAPH_SCHEMA";
pub const QUESTION_ENV_VAR: &str = "CODEGRAPH_QUESTION";

/// What a translator needs to know to write SQLite against the graph
pub const GRAPH_SCHEMA_DESCRIPTION: &str = "\
The code graph is stored in SQLite with two tables.

nodes(label, qualified_name, name, path, impl_path, start_line, end_line,
      docstring, language, extension, version_spec)
  PRIMARY KEY (label, qualified_name)
  label is one of: Project, Package, Folder, File, Module, Class, Function,
  Method, ExternalPackage.
  qualified_name is the fully-qualified name for Module, Class, Function and
  Method (unique across those four labels), the dotted name for Package, the
  relative path for Folder and File, and the name for Project and
  ExternalPackage.
  start_line and end_line are 1-based and inclusive. impl_path is set when a
  definition lives in another file than its declaration. extension is set on
  File nodes, version_spec on ExternalPackage nodes.

edges(src_label, src, rel_type, dst_label, dst)
  (src_label, src) and (dst_label, dst) reference nodes(label, qualified_name).
  rel_type is one of:
    DEFINES              Module -> Class or Function
    DEFINES_METHOD       Class -> Method
    CONTAINS_PACKAGE     Project or Folder -> Package
    CONTAINS_SUBPACKAGE  Package -> Package
    CONTAINS_FOLDER      Project, Package or Folder -> Folder
    CONTAINS_MODULE      Project, Package or Folder -> Module
    CONTAINS_FILE        Project, Package or Folder -> File
    DEPENDS_ON_EXTERNAL  Project -> ExternalPackage

Answer with a single SQLite SELECT (or WITH) statement and nothing else.
";

/// Bare language tags a model may put on the first line
const LANGUAGE_TAGS: &[&str] = &["sql", "sqlite", "cypher", "query"];

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("no translator command configured (set [translator] command or CODEGRAPH_TRANSLATOR)")]
    NotConfigured,

    #[error("question is empty")]
    EmptyQuestion,

    #[error("failed to run translator '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("translator exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("translator returned no query")]
    Empty,

    #[error("translator output is not a read query: {0}")]
    NotAQuery(String),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Natural language in, store-native read query out
pub trait QueryTranslator {
    fn translate(&self, question: &str) -> Result<String, TranslateError>;
}

/// Runs an external command: schema and question on stdin, query on stdout
///
/// The schema and the question are also exported as `CODEGRAPH_SCHEMA` and
/// `CODEGRAPH_QUESTION`.
#[derive(Debug, Clone)]
pub struct CommandTranslator {
    program: String,
    args: Vec<String>,
}

impl CommandTranslator {
    pub fn new(argv: &[String]) -> Result<Self, TranslateError> {
        let (program, args) = argv.split_first().ok_or(TranslateError::NotConfigured)?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn from_config(config: &TranslatorConfig) -> Result<Self, TranslateError> {
        Self::new(&config.command)
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl QueryTranslator for CommandTranslator {
    fn translate(&self, question: &str) -> Result<String, TranslateError> {
        let spawn_error = |source| TranslateError::Spawn {
            command: self.command_line(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(SCHEMA_ENV_VAR, GRAPH_SCHEMA_DESCRIPTION)
            .env(QUESTION_ENV_VAR, question)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        if let Some(mut stdin) = child.stdin.take() {
            // Commands that ignore stdin may exit before reading it
            let prompt = translator_prompt(question);
            if let Err(e) = stdin.write_all(prompt.as_bytes()) {
                if e.kind() != ErrorKind::BrokenPipe {
                    return Err(spawn_error(e));
                }
            }
        }
        let output = child.wait_with_output().map_err(spawn_error)?;

        if !output.status.success() {
            return Err(TranslateError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        debug!("Translator output: {}", raw.trim());
        clean_query_text(&raw)
    }
}

/// Schema description followed by the question
pub fn translator_prompt(question: &str) -> String {
    format!("{GRAPH_SCHEMA_DESCRIPTION}\nQuestion: {question}\n")
}

/// Strip fences, backticks and a language tag; end with exactly one `;`
///
/// The result must start with `SELECT` or `WITH`.
pub fn clean_query_text(raw: &str) -> Result<String, TranslateError> {
    let mut text = raw.trim().to_string();

    if let Some(captures) = CODE_FENCE_RE.captures(&text) {
        text = captures
            .get(1)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
    }
    text = text.trim_matches('`').trim().to_string();

    if let Some((first_line, rest)) = text.split_once('\n') {
        let tag = first_line.trim();
        if LANGUAGE_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            text = rest.trim().to_string();
        }
    }

    let text = text.trim_end().trim_end_matches(';').trim_end();
    if text.is_empty() {
        return Err(TranslateError::Empty);
    }

    let first_word = text
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default();
    if !(first_word.eq_ignore_ascii_case("select") || first_word.eq_ignore_ascii_case("with")) {
        return Err(TranslateError::NotAQuery(text.to_string()));
    }

    Ok(format!("{text};"))
}

/// Result of one question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnswer {
    pub question: String,
    pub query_used: String,
    pub results: Vec<Row>,
    pub summary: String,
}

/// Answers questions with a translator and a (read-only) store
pub struct GraphQuestions<'a> {
    store: &'a dyn GraphStore,
    translator: &'a dyn QueryTranslator,
}

impl<'a> GraphQuestions<'a> {
    pub fn new(store: &'a dyn GraphStore, translator: &'a dyn QueryTranslator) -> Self {
        Self { store, translator }
    }

    pub fn ask(&self, question: &str) -> Result<QueryAnswer, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(TranslateError::EmptyQuestion.into());
        }

        let query = self.translator.translate(question)?;
        info!("Running translated query: {}", query);
        let results = self.store.fetch_all(&query, &[])?;

        Ok(QueryAnswer {
            question: question.to_string(),
            summary: summarize(&results),
            query_used: query,
            results,
        })
    }
}

fn summarize(results: &[Row]) -> String {
    match results.first() {
        None => "No results.".to_string(),
        Some(first) => {
            let columns: Vec<&str> = first.keys().map(String::as_str).collect();
            let noun = if results.len() == 1 { "row" } else { "rows" };
            format!("{} {} ({})", results.len(), noun, columns.join(", "))
        }
    }
}
