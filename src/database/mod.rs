//! Graph store
//!
//! The ingestor and the retriever only need three things from storage: run a
//! write, fetch rows for a read, and hold exclusive write access for a whole
//! ingestion run. `GraphStore` is that contract; `SqliteGraphStore` implements
//! it on a single SQLite database file.

use rusqlite::types::ToSql;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;

mod helpers;
pub mod queries;
mod schema;
pub mod types;

pub use helpers::{row_i64, row_str, row_u32};
pub use queries::graph_stats;
pub use schema::SCHEMA_VERSION;
pub use types::*;

/// Minimal storage capability consumed by ingestion and retrieval
pub trait GraphStore {
    /// Run a write statement; returns the number of rows changed
    fn execute(&self, statement: &str, params: Params<'_>) -> Result<usize, StoreError>;

    /// Run a read statement and collect every row
    fn fetch_all(&self, statement: &str, params: Params<'_>) -> Result<Vec<Row>, StoreError>;

    /// Start a transaction that excludes every other writer
    fn begin_exclusive(&self) -> Result<(), StoreError>;

    fn commit(&self) -> Result<(), StoreError>;

    fn rollback(&self) -> Result<(), StoreError>;

    /// Run `f` inside an exclusive transaction
    ///
    /// Commits when `f` succeeds; rolls back when `f` or the commit fails.
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        Self: Sized,
        E: From<StoreError>,
        F: FnOnce(&Self) -> Result<T, E>,
    {
        self.begin_exclusive()?;

        let result = f(self).and_then(|value| {
            self.commit()?;
            Ok(value)
        });

        if result.is_err() {
            if let Err(e) = self.rollback() {
                warn!("Rollback after failed transaction also failed: {}", e);
            }
        }
        result
    }
}

/// SQLite-backed graph store. The connection closes when the store is dropped.
pub struct SqliteGraphStore {
    conn: Connection,
    path: PathBuf,
    read_only: bool,
}

impl SqliteGraphStore {
    /// Open (creating if needed) a read-write store and ensure its schema
    pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        info!("Opening graph store at: {}", path.display());

        let conn = Connection::open(&path).map_err(|source| StoreError::Open {
            path: path.clone(),
            source,
        })?;
        Self::configure(&conn, busy_timeout, false)?;

        let store = Self {
            conn,
            path,
            read_only: false,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Open an existing store for reads only. Writes fail at the SQLite level.
    pub fn open_read_only<P: AsRef<Path>>(
        path: P,
        busy_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        debug!("Opening graph store read-only at: {}", path.display());

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&path, flags).map_err(|source| StoreError::Open {
            path: path.clone(),
            source,
        })?;
        Self::configure(&conn, busy_timeout, true)?;

        let store = Self {
            conn,
            path,
            read_only: true,
        };
        store.check_schema_present()?;
        Ok(store)
    }

    /// Private in-memory store
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let path = PathBuf::from(":memory:");
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: path.clone(),
            source,
        })?;
        Self::configure(&conn, Duration::ZERO, false)?;

        let store = Self {
            conn,
            path,
            read_only: false,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        Self::open(&config.path, Duration::from_millis(config.busy_timeout_ms))
    }

    pub fn read_only_from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        Self::open_read_only(&config.path, Duration::from_millis(config.busy_timeout_ms))
    }

    fn configure(
        conn: &Connection,
        busy_timeout: Duration,
        read_only: bool,
    ) -> Result<(), StoreError> {
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        if read_only {
            conn.pragma_update(None, "query_only", true)?;
        } else {
            // WAL lets retrievals read the last committed graph while a rebuild runs
            let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
            debug!("Graph store journal mode: {}", mode);
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

impl GraphStore for SqliteGraphStore {
    fn execute(&self, statement: &str, params: Params<'_>) -> Result<usize, StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        let bound = bind(params);
        let mut stmt = self.conn.prepare_cached(statement)?;
        Ok(stmt.execute(bound.as_refs().as_slice())?)
    }

    fn fetch_all(&self, statement: &str, params: Params<'_>) -> Result<Vec<Row>, StoreError> {
        let bound = bind(params);
        let mut stmt = self.conn.prepare_cached(statement)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query(bound.as_refs().as_slice())?;
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (index, column) in columns.iter().enumerate() {
                record.insert(column.clone(), helpers::sql_to_json(row.get_ref(index)?));
            }
            results.push(record);
        }
        Ok(results)
    }

    fn begin_exclusive(&self) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        self.conn.execute_batch("BEGIN EXCLUSIVE")?;
        Ok(())
    }

    fn commit(&self) -> Result<(), StoreError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&self) -> Result<(), StoreError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

/// Owned SQLite values for one statement's named parameters
struct BoundParams(Vec<(String, rusqlite::types::Value)>);

impl BoundParams {
    fn as_refs(&self) -> Vec<(&str, &dyn ToSql)> {
        self.0
            .iter()
            .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
            .collect()
    }
}

fn bind(params: Params<'_>) -> BoundParams {
    BoundParams(
        params
            .iter()
            .map(|(name, value)| (helpers::parameter_name(name), helpers::json_to_sql(value)))
            .collect(),
    )
}
