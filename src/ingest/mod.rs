//! Graph ingestion
//!
//! A run is a full rebuild: clear the graph, parse every supported file, merge
//! the results with the repository layout and write them back. Clear, stage
//! and commit happen inside one exclusive transaction, so readers see either
//! the previous graph or the new one and two runs can never interleave. Only
//! the parse stage is parallel.

mod batch;
mod graph;
mod structure;

pub use batch::GraphBatch;
pub use graph::{GraphEdge, GraphNode, NodeLabel, NodeRef, Relation, StagedGraph};
pub use structure::{ExternalDependency, PYPROJECT_FILE, RepositoryLayout, parse_pyproject};

use crate::config::{Config, ConfigError};
use crate::database::queries::{CLEAR_EDGES, CLEAR_NODES, INSERT_EDGE, INSERT_NODE};
use crate::database::{GraphStore, SqliteGraphStore, StoreError};
use crate::extractors::{ExtractorManager, LanguageRegistry};
use crate::walker::{RepositoryWalker, SourceFile, WalkEntry};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("repository root {path} is not accessible: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("repository root {path} is not a directory")]
    NotADirectory { path: PathBuf },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to start parse workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("no languages enabled; refusing to replace the graph with an empty one")]
    NoLanguages,
}

/// A file left out of the graph and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Summary of one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub root: PathBuf,
    pub files_discovered: usize,
    pub files_parsed: usize,
    /// Parsed with syntax errors; entities are best-effort
    pub files_with_syntax_errors: usize,
    pub skipped: Vec<SkippedFile>,
    pub packages: usize,
    pub folders: usize,
    /// Every file the walk kept, parsed or not
    pub file_nodes: usize,
    pub modules: usize,
    pub types: usize,
    pub functions: usize,
    pub methods: usize,
    pub external_packages: usize,
    pub edges: usize,
    pub duplicates: usize,
    pub demoted_methods: usize,
    pub elapsed_ms: u64,
}

/// Drives walker, extractors and store through one full rebuild
pub struct GraphIngestor<'a> {
    config: &'a Config,
    registry: &'a LanguageRegistry,
}

impl<'a> GraphIngestor<'a> {
    pub fn new(config: &'a Config, registry: &'a LanguageRegistry) -> Self {
        Self { config, registry }
    }

    /// Replace the graph in `store` with the graph of `root`
    ///
    /// Per-file failures are reported in `IngestReport::skipped`. Store
    /// failures abort the run and leave the previous graph in place.
    pub fn ingest<S: GraphStore>(
        &self,
        store: &S,
        root: &Path,
    ) -> Result<IngestReport, IngestError> {
        let start = Instant::now();
        if self.registry.is_empty() {
            return Err(IngestError::NoLanguages);
        }
        let root = canonical_root(root)?;
        let project_name = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let walker = RepositoryWalker::new(&root, self.registry, &self.config.walker)?;
        let mut batch = GraphBatch::new(project_name.as_str());
        let mut sources: Vec<SourceFile> = Vec::new();
        let mut pyprojects: Vec<String> = Vec::new();
        for entry in walker.entries() {
            match entry {
                WalkEntry::Directory(relative_path) => batch.record_directory(&relative_path),
                WalkEntry::File {
                    relative_path,
                    source,
                } => {
                    batch.record_file(&relative_path);
                    if structure::file_name(&relative_path) == PYPROJECT_FILE {
                        pyprojects.push(relative_path);
                    }
                    sources.extend(source);
                }
            }
        }
        info!("🚀 Ingesting {} ({} source files)", root.display(), sources.len());

        let mut report = IngestReport {
            files_discovered: sources.len(),
            ..IngestReport::default()
        };
        for relative_path in &pyprojects {
            match read_dependencies(&root, relative_path) {
                Ok(dependencies) => batch.add_dependencies(dependencies),
                Err(reason) => {
                    warn!("Skipping {}: {}", relative_path, reason);
                    report.skipped.push(SkippedFile {
                        path: relative_path.clone(),
                        reason,
                    });
                }
            }
        }

        let mut report = store.transaction(|tx| -> Result<IngestReport, IngestError> {
            tx.execute(CLEAR_EDGES, &[])?;
            let cleared = tx.execute(CLEAR_NODES, &[])?;
            debug!("Cleared {} nodes from the previous graph", cleared);

            self.parse_files(&sources, &project_name, &mut batch, &mut report)?;
            let staged = batch.stage();
            write_staged(tx, &staged)?;

            report.packages = staged.count(NodeLabel::Package);
            report.folders = staged.count(NodeLabel::Folder);
            report.file_nodes = staged.count(NodeLabel::File);
            report.modules = staged.count(NodeLabel::Module);
            report.types = staged.count(NodeLabel::Class);
            report.functions = staged.count(NodeLabel::Function);
            report.methods = staged.count(NodeLabel::Method);
            report.external_packages = staged.count(NodeLabel::ExternalPackage);
            report.edges = staged.edges.len();
            report.duplicates = staged.duplicates;
            report.demoted_methods = staged.demoted;
            Ok(report)
        })?;

        report.root = root;
        report.elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            "✅ Ingested {} files ({} skipped): {} modules, {} types, {} functions, {} methods \
             in {}ms",
            report.files_parsed,
            report.skipped.len(),
            report.modules,
            report.types,
            report.functions,
            report.methods,
            report.elapsed_ms
        );
        Ok(report)
    }

    /// Parse on a dedicated pool; results keep the walker's order
    fn parse_files(
        &self,
        files: &[SourceFile],
        project_name: &str,
        batch: &mut GraphBatch,
        report: &mut IngestReport,
    ) -> Result<(), IngestError> {
        let threads = self.config.ingest.effective_parse_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("codegraph-parse-{i}"))
            .build()?;
        debug!("Parsing with {} worker threads", threads);

        let manager = ExtractorManager::new(project_name);
        let results: Vec<_> = pool.install(|| {
            files
                .par_iter()
                .map(|file| (file, manager.extract_file(file)))
                .collect()
        });

        for (file, result) in results {
            match result {
                Ok(extraction) => {
                    report.files_parsed += 1;
                    if extraction.had_syntax_errors {
                        report.files_with_syntax_errors += 1;
                    }
                    batch.add_file(extraction);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", file.relative_path, e);
                    report.skipped.push(SkippedFile {
                        path: file.relative_path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Open the configured store for exactly the duration of one run
pub fn ingest_repository(config: &Config, root: &Path) -> Result<IngestReport, IngestError> {
    let registry = config.language_registry()?;
    let store = SqliteGraphStore::from_config(&config.store)?;
    GraphIngestor::new(config, &registry).ingest(&store, root)
}

fn canonical_root(root: &Path) -> Result<PathBuf, IngestError> {
    let canonical = root.canonicalize().map_err(|source| IngestError::Root {
        path: root.to_path_buf(),
        source,
    })?;
    if !canonical.is_dir() {
        return Err(IngestError::NotADirectory { path: canonical });
    }
    Ok(canonical)
}

fn read_dependencies(
    root: &Path,
    relative_path: &str,
) -> Result<Vec<ExternalDependency>, String> {
    let content = fs::read_to_string(root.join(relative_path)).map_err(|e| e.to_string())?;
    let dependencies = parse_pyproject(&content).map_err(|e| e.to_string())?;
    debug!("{} declares {} dependencies", relative_path, dependencies.len());
    Ok(dependencies)
}

/// Nodes first: edges reference both endpoints by label and key
fn write_staged<S: GraphStore>(store: &S, staged: &StagedGraph) -> Result<(), StoreError> {
    for node in &staged.nodes {
        store.execute(
            INSERT_NODE,
            &[
                ("label", json!(node.label.as_str())),
                ("qualified_name", json!(node.qualified_name)),
                ("name", json!(node.name)),
                ("path", json!(node.path)),
                ("impl_path", json!(node.impl_path)),
                ("start_line", json!(node.start_line)),
                ("end_line", json!(node.end_line)),
                ("docstring", json!(node.docstring)),
                ("language", json!(node.language)),
                ("extension", json!(node.extension)),
                ("version_spec", json!(node.version_spec)),
            ],
        )?;
    }

    for edge in &staged.edges {
        store.execute(
            INSERT_EDGE,
            &[
                ("src_label", json!(edge.src.label.as_str())),
                ("src", json!(edge.src.key)),
                ("rel_type", json!(edge.relation.as_str())),
                ("dst_label", json!(edge.dst.label.as_str())),
                ("dst", json!(edge.dst.key)),
            ],
        )?;
    }

    debug!("Wrote {} nodes and {} edges", staged.nodes.len(), staged.edges.len());
    Ok(())
}
