// Graph store type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// One result row: column name -> JSON value, in select-list order
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Named statement parameters; names may be given with or without the leading `:`
pub type Params<'a> = &'a [(&'a str, serde_json::Value)];

/// Storage failures. These are fatal to the operation that hit them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open graph store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("graph store at {path} has no graph yet (run `codegraph ingest` first)")]
    MissingSchema { path: PathBuf },

    #[error(
        "graph store schema version {found} is not supported (expected {supported}); \
         re-run `codegraph ingest`"
    )]
    UnsupportedSchema { found: i64, supported: i64 },

    #[error("graph store is read-only")]
    ReadOnly,

    #[error("graph store statement failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Node and edge counts for health checks and the `stats` command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub projects: i64,
    pub packages: i64,
    pub folders: i64,
    pub files: i64,
    pub modules: i64,
    pub classes: i64,
    pub functions: i64,
    pub methods: i64,
    pub external_packages: i64,
    pub edges: i64,
    /// Classes, functions and methods with no inbound DEFINES/DEFINES_METHOD edge
    pub orphans: i64,
    /// Packages, folders, files and modules with no inbound CONTAINS_* edge
    pub uncontained: i64,
}

impl GraphStats {
    pub fn total_nodes(&self) -> i64 {
        self.projects
            + self.packages
            + self.folders
            + self.files
            + self.modules
            + self.classes
            + self.functions
            + self.methods
            + self.external_packages
    }
}
