//! Configuration
//!
//! Loaded from a TOML file (`codegraph.toml` by default) with every field
//! optional, then adjusted by `CODEGRAPH_*` environment overrides.

use crate::extractors::LanguageRegistry;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "codegraph.toml";

pub const ENV_DB: &str = "CODEGRAPH_DB";
pub const ENV_PARSE_THREADS: &str = "CODEGRAPH_PARSE_THREADS";
pub const ENV_TRANSLATOR: &str = "CODEGRAPH_TRANSLATOR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid ignore pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("invalid value '{value}' for {name}")]
    InvalidOverride { name: &'static str, value: String },

    #[error("unknown language '{name}' in ingest.languages (supported: {supported})")]
    UnknownLanguage { name: String, supported: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub walker: WalkerConfig,
    pub ingest: IngestConfig,
    pub translator: TranslatorConfig,
}

/// Where the graph lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,

    /// How long a writer waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("codegraph.db"),
            busy_timeout_ms: 5_000,
        }
    }
}

/// Which files the repository walk visits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkerConfig {
    /// Directory names pruned wherever they appear
    pub ignore_dirs: Vec<String>,

    /// Globs matched against repository-relative paths
    pub ignore_patterns: Vec<String>,

    /// Files larger than this (bytes) are skipped
    pub max_file_size: u64,

    pub follow_links: bool,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            ignore_dirs: [
                ".git",
                ".svn",
                ".hg",
                "node_modules",
                "target",
                "build",
                "dist",
                "out",
                "__pycache__",
                ".pytest_cache",
                ".mypy_cache",
                ".venv",
                "venv",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            ignore_patterns: Vec::new(),
            max_file_size: 1024 * 1024, // 1MB
            follow_links: false,
        }
    }
}

impl WalkerConfig {
    /// Compile `ignore_patterns` into a matcher
    pub fn ignore_globset(&self) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.ignore_patterns {
            let glob = Glob::new(pattern).map_err(|source| ConfigError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|source| ConfigError::InvalidGlob {
            pattern: self.ignore_patterns.join(", "),
            source,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Parse worker threads; 0 means one per CPU
    pub parse_threads: usize,

    /// Languages to ingest (empty = all supported)
    pub languages: Vec<String>,
}

impl IngestConfig {
    pub fn effective_parse_threads(&self) -> usize {
        if self.parse_threads == 0 {
            num_cpus::get()
        } else {
            self.parse_threads
        }
    }
}

/// External natural-language-to-query command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Program and arguments, e.g. `["llm", "-m", "local"]`
    pub command: Vec<String>,
}

impl Config {
    /// Load from `path`, or from `codegraph.toml` in the working directory if it
    /// exists, or fall back to defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Apply `CODEGRAPH_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup(ENV_DB).filter(|v| !v.trim().is_empty()) {
            self.store.path = PathBuf::from(db);
        }

        if let Some(threads) = lookup(ENV_PARSE_THREADS) {
            self.ingest.parse_threads =
                threads
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidOverride {
                        name: ENV_PARSE_THREADS,
                        value: threads.clone(),
                    })?;
        }

        if let Some(command) = lookup(ENV_TRANSLATOR) {
            let argv: Vec<String> = command.split_whitespace().map(str::to_string).collect();
            if argv.is_empty() {
                return Err(ConfigError::InvalidOverride {
                    name: ENV_TRANSLATOR,
                    value: command,
                });
            }
            self.translator.command = argv;
        }

        Ok(())
    }

    /// Built-in languages narrowed to `ingest.languages`
    ///
    /// Every listed name must be a supported language.
    pub fn language_registry(&self) -> Result<LanguageRegistry, ConfigError> {
        let mut registry = LanguageRegistry::with_defaults();
        let supported = registry.supported_languages();
        let unknown = self
            .ingest
            .languages
            .iter()
            .find(|name| !supported.iter().any(|s| s.eq_ignore_ascii_case(name)));
        if let Some(name) = unknown {
            return Err(ConfigError::UnknownLanguage {
                name: name.clone(),
                supported: supported.join(", "),
            });
        }

        registry.restrict_to(&self.ingest.languages);
        Ok(registry)
    }
}
