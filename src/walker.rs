//! Repository walker
//!
//! Lazily enumerates the directories and files under a root; files whose
//! extension maps to a registered language come with a `SourceFile`. Ignored
//! directories are pruned before descent, so large build trees cost nothing.
//! Traversal is sorted by file name, which keeps ingestion deterministic.

use crate::config::{ConfigError, WalkerConfig};
use crate::extractors::{LanguageExtractor, LanguageRegistry};
use crate::utils::paths::to_relative_unix_style;
use globset::GlobSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// A file the registry knows how to extract
#[derive(Clone)]
pub struct SourceFile {
    pub absolute_path: PathBuf,
    /// Repository-relative, Unix-style
    pub relative_path: String,
    pub language: Arc<dyn LanguageExtractor>,
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("relative_path", &self.relative_path)
            .field("language", &self.language.name())
            .finish()
    }
}

/// One directory or file below the root
#[derive(Debug, Clone)]
pub enum WalkEntry {
    /// Repository-relative, Unix-style
    Directory(String),
    File {
        /// Repository-relative, Unix-style
        relative_path: String,
        /// Set when the file is in a registered language and within the size limit
        source: Option<SourceFile>,
    },
}

pub struct RepositoryWalker<'a> {
    root: PathBuf,
    registry: &'a LanguageRegistry,
    config: &'a WalkerConfig,
    ignore_globs: GlobSet,
}

impl<'a> RepositoryWalker<'a> {
    pub fn new(
        root: impl Into<PathBuf>,
        registry: &'a LanguageRegistry,
        config: &'a WalkerConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            root: root.into(),
            registry,
            config,
            ignore_globs: config.ignore_globset()?,
        })
    }

    /// Every kept directory and file below the root, in sorted path order
    pub fn entries(&self) -> impl Iterator<Item = WalkEntry> + '_ {
        WalkDir::new(&self.root)
            .follow_links(self.config.follow_links)
            .sort_by_file_name()
            .min_depth(1)
            .into_iter()
            .filter_entry(move |entry| !self.is_ignored(entry))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable path during walk: {}", e);
                    None
                }
            })
            .filter_map(move |entry| self.classify(&entry))
    }

    fn classify(&self, entry: &DirEntry) -> Option<WalkEntry> {
        let Some(relative_path) = to_relative_unix_style(entry.path(), &self.root) else {
            warn!(
                "Skipping {}: not representable under {}",
                entry.path().display(),
                self.root.display()
            );
            return None;
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            Some(WalkEntry::Directory(relative_path))
        } else if file_type.is_file() {
            let source = self.source_file(entry, &relative_path);
            Some(WalkEntry::File {
                relative_path,
                source,
            })
        } else {
            None
        }
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        if entry.file_type().is_dir() {
            let name = entry.file_name().to_string_lossy();
            if self.config.ignore_dirs.iter().any(|ignored| *ignored == name) {
                return true;
            }
        }

        if self.ignore_globs.is_empty() {
            return false;
        }
        to_relative_unix_style(entry.path(), &self.root)
            .is_some_and(|relative| self.ignore_globs.is_match(&relative))
    }

    fn source_file(&self, entry: &DirEntry, relative_path: &str) -> Option<SourceFile> {
        let path = entry.path();
        let language = self.registry.for_path(path)?;

        match entry.metadata() {
            Ok(metadata) if metadata.len() > self.config.max_file_size => {
                debug!(
                    "Skipping {} ({} bytes exceeds max_file_size {})",
                    path.display(),
                    metadata.len(),
                    self.config.max_file_size
                );
                return None;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                return None;
            }
        }

        Some(SourceFile {
            absolute_path: path.to_path_buf(),
            relative_path: relative_path.to_string(),
            language,
        })
    }
}
