//! On-disk fixture repositories
//!
//! The repository root is always a directory named `proj` so module names
//! that carry the project name are stable across runs.

use crate::config::Config;
use crate::database::SqliteGraphStore;
use crate::ingest::{GraphIngestor, IngestReport};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::unique_temp_dir;

pub struct FixtureRepo {
    _dir: TempDir,
    root: PathBuf,
    db_path: PathBuf,
}

impl FixtureRepo {
    pub fn new(test_name: &str) -> Self {
        let dir = unique_temp_dir(test_name);
        let root = dir.path().join("proj");
        fs::create_dir(&root).expect("Failed to create fixture root");
        let db_path = dir.path().join("graph.db");
        Self {
            _dir: dir,
            root,
            db_path,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn write(&self, relative_path: &str, content: &str) -> &Self {
        let path = self.root.join(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create fixture directory");
        }
        fs::write(path, content).expect("Failed to write fixture file");
        self
    }

    pub fn remove(&self, relative_path: &str) {
        fs::remove_file(self.root.join(relative_path)).expect("Failed to remove fixture file");
    }

    /// Default config pointed at this fixture's database
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.store.path = self.db_path.clone();
        config.ingest.parse_threads = 2;
        config
    }

    pub fn open_store(&self) -> SqliteGraphStore {
        SqliteGraphStore::from_config(&self.config().store)
            .expect("Failed to open fixture store")
    }

    pub fn open_reader(&self) -> SqliteGraphStore {
        SqliteGraphStore::read_only_from_config(&self.config().store)
            .expect("Failed to open fixture store read-only")
    }
}

/// Ingest the fixture into its own database
pub fn ingest_fixture(repo: &FixtureRepo) -> IngestReport {
    let config = repo.config();
    let registry = config
        .language_registry()
        .expect("Invalid fixture language list");
    let store = repo.open_store();
    GraphIngestor::new(&config, &registry)
        .ingest(&store, repo.root())
        .expect("Fixture ingestion failed")
}

/// A header declares `Vec3::dot`; the source file defines it at lines 10-14
pub const VEC_HEADER: &str = r#"#pragma once

/// A 3D vector.
struct Vec3 {
    float x, y, z;
    float dot(const Vec3& other) const;
};
"#;

pub const VEC_SOURCE: &str = r#"#include "vec.h"

static float sq(float v) {
    return v * v;
}

float norm2(const Vec3& v) { return sq(v.x) + sq(v.y) + sq(v.z); }


float Vec3::dot(const Vec3& other) const {
    return x * other.x +
           y * other.y +
           z * other.z;
}
"#;

pub const DOT_BODY: &str = r#"float Vec3::dot(const Vec3& other) const {
    return x * other.x +
           y * other.y +
           z * other.z;
}
"#;

pub const SHAPES_PY: &str = r#"import math


class Circle:
    """A circle."""

    def __init__(self, r):
        self.r = r

    def area(self):
        return math.pi * self.r ** 2


def unit():
    return Circle(1)
"#;

pub const COUNTER_RS: &str = r#"/// Counts things.
pub struct Counter {
    n: u64,
}

impl Counter {
    pub fn bump(&mut self) {
        self.n += 1;
    }
}
"#;

/// C++, Python and Rust sources in one repository
pub fn mixed_repo(test_name: &str) -> FixtureRepo {
    let repo = FixtureRepo::new(test_name);
    repo.write("math/vec.h", VEC_HEADER)
        .write("math/vec.cc", VEC_SOURCE)
        .write("pkg/__init__.py", "")
        .write("pkg/shapes.py", SHAPES_PY)
        .write("src/counter.rs", COUNTER_RS)
        .write("README.md", "# not source\n");
    repo
}
