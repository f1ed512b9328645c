/// codegraph: build a structural graph of a repository and query it
///
/// Commands:
/// - ingest: full rebuild of the graph from a repository
/// - snippet: exact source lines for a fully-qualified name
/// - query: run a read query against the graph
/// - ask: translate a question into a query and run it
/// - stats: node, edge and integrity counts
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codegraph::config::Config;
use codegraph::database::{GraphStore, SqliteGraphStore, graph_stats};
use codegraph::query::{CommandTranslator, GraphQuestions};
use codegraph::{SnippetRetriever, ingest_repository};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;

#[derive(Parser)]
#[command(name = "codegraph")]
#[command(about = "Structural code graph ingestion and exact snippet retrieval", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./codegraph.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Graph database path (overrides the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Optional log file path for debug logging
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the graph from a repository (replaces any previous graph)
    Ingest {
        /// Repository root
        repo: PathBuf,

        /// Parse worker threads (defaults to CPU count)
        #[arg(short, long)]
        threads: Option<usize>,
    },

    /// Print the source lines defining a fully-qualified name
    Snippet {
        /// e.g. `Vec3::dot` or `proj.pkg.module.Class.method`
        qualified_name: String,

        /// Repository root the graph was built from
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
    },

    /// Run a read query against the graph
    Query { statement: String },

    /// Answer a natural-language question through the configured translator
    Ask { question: String },

    /// Node, edge and integrity counts
    Stats,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref())?;

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(db) = cli.db {
        config.store.path = db;
    }
    debug!("Using graph store at {}", config.store.path.display());

    match cli.command {
        Commands::Ingest { repo, threads } => {
            if let Some(threads) = threads {
                config.ingest.parse_threads = threads;
            }
            let report = ingest_repository(&config, &repo)
                .with_context(|| format!("Failed to ingest {}", repo.display()))?;
            print_json(&report)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Snippet {
            qualified_name,
            root,
        } => {
            let store = open_reader(&config)?;
            let snippet = SnippetRetriever::new(&root, &store)
                .find_snippet(&qualified_name)
                .context("Graph lookup failed")?;
            print_json(&snippet)?;
            Ok(if snippet.found {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Query { statement } => {
            let store = open_reader(&config)?;
            let rows = store.fetch_all(&statement, &[]).context("Query failed")?;
            print_json(&rows)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Ask { question } => {
            let store = open_reader(&config)?;
            let translator = CommandTranslator::from_config(&config.translator)?;
            let answer = GraphQuestions::new(&store, &translator)
                .ask(&question)
                .context("Failed to answer question")?;
            print_json(&answer)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Stats => {
            let store = open_reader(&config)?;
            let stats = graph_stats(&store).context("Failed to collect graph statistics")?;
            print_json(&stats)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn open_reader(config: &Config) -> Result<SqliteGraphStore> {
    SqliteGraphStore::read_only_from_config(&config.store)
        .with_context(|| format!("Failed to open graph store {}", config.store.path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

/// Initialize logging with optional file output
fn init_logging(log_path: Option<&Path>) -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("codegraph=info"));

    if let Some(log_file) = log_path {
        // With log file: everything the filter allows to file, warn+ to stderr
        let file_appender = tracing_appender::rolling::never(
            log_file.parent().unwrap_or_else(|| Path::new(".")),
            log_file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("codegraph.log"),
        );

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_writer(file_appender.and(std::io::stderr.with_max_level(tracing::Level::WARN)))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

        eprintln!("📝 Debug logging enabled: {:?}", log_file);
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
    }

    Ok(())
}
