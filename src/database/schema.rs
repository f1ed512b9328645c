// Graph schema creation and version check

use super::*;
use tracing::{debug, info};

/// Bumped whenever the table layout changes
pub const SCHEMA_VERSION: i64 = 2;

/// Every node label the store accepts
pub const NODE_LABELS: &str = "'Project', 'Package', 'Folder', 'File', 'Module', \
     'Class', 'Function', 'Method', 'ExternalPackage'";

/// Labels resolvable by qualified name; they share one namespace
pub const CODE_LABELS: &str = "'Module', 'Class', 'Function', 'Method'";

/// DEFINES and DEFINES_METHOD: the single owner of a code entity
pub const OWNERSHIP_RELATIONS: &str = "'DEFINES', 'DEFINES_METHOD'";

pub const CONTAINMENT_RELATIONS: &str = "'CONTAINS_PACKAGE', 'CONTAINS_SUBPACKAGE', \
     'CONTAINS_FOLDER', 'CONTAINS_MODULE', 'CONTAINS_FILE'";

impl SqliteGraphStore {
    /// Create tables and indexes if missing (the "ensure constraints" step)
    pub(super) fn ensure_schema(&self) -> Result<(), StoreError> {
        let version = self.schema_version()?;
        if version > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                found: version,
                supported: SCHEMA_VERSION,
            });
        }
        if version > 0 && version < SCHEMA_VERSION {
            // The graph is rebuilt on every ingest, so older layouts are dropped
            info!(
                "Graph store schema {} is outdated; dropping it for version {}",
                version, SCHEMA_VERSION
            );
            self.conn
                .execute_batch("DROP TABLE IF EXISTS edges; DROP TABLE IF EXISTS nodes;")?;
        }

        self.create_nodes_table()?;
        self.create_edges_table()?;
        if version != SCHEMA_VERSION {
            self.conn
                .pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }

        debug!("Graph schema ready (version {})", SCHEMA_VERSION);
        Ok(())
    }

    /// Read-only connections cannot create tables; fail early with a clear message
    pub(super) fn check_schema_present(&self) -> Result<(), StoreError> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('nodes', 'edges')",
            [],
            |row| row.get(0),
        )?;
        if tables < 2 {
            return Err(StoreError::MissingSchema {
                path: self.path.clone(),
            });
        }

        let version = self.schema_version()?;
        if version != SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                found: version,
                supported: SCHEMA_VERSION,
            });
        }
        Ok(())
    }

    fn schema_version(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    fn create_nodes_table(&self) -> Result<(), StoreError> {
        // `qualified_name` is the key within a label: the qualified name of a
        // code entity, the relative path of a folder or file, the dotted name
        // of a package, the name of a project or external package
        self.conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS nodes (
                    label TEXT NOT NULL CHECK(label IN ({NODE_LABELS})),
                    qualified_name TEXT NOT NULL,
                    name TEXT NOT NULL,
                    path TEXT,
                    impl_path TEXT,
                    start_line INTEGER,
                    end_line INTEGER,
                    docstring TEXT,
                    language TEXT,
                    extension TEXT,
                    version_spec TEXT,
                    PRIMARY KEY(label, qualified_name),
                    CHECK(start_line IS NULL OR end_line IS NULL OR start_line <= end_line)
                )"
            ),
            [],
        )?;

        // No two code entities share a qualified name, whatever their labels
        self.conn.execute(
            &format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_nodes_code_name \
                 ON nodes(qualified_name) WHERE label IN ({CODE_LABELS})"
            ),
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_nodes_label ON nodes(label)",
            [],
        )?;

        debug!("Created nodes table and indexes");
        Ok(())
    }

    fn create_edges_table(&self) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS edges (
                    src_label TEXT NOT NULL,
                    src TEXT NOT NULL,
                    rel_type TEXT NOT NULL CHECK(rel_type IN (
                        {OWNERSHIP_RELATIONS}, {CONTAINMENT_RELATIONS}, 'DEPENDS_ON_EXTERNAL'
                    )),
                    dst_label TEXT NOT NULL,
                    dst TEXT NOT NULL,
                    FOREIGN KEY(src_label, src) REFERENCES nodes(label, qualified_name)
                        ON DELETE CASCADE,
                    FOREIGN KEY(dst_label, dst) REFERENCES nodes(label, qualified_name)
                        ON DELETE CASCADE,
                    UNIQUE(src_label, src, rel_type, dst_label, dst)
                )"
            ),
            [],
        )?;

        // One owner per code entity
        self.conn.execute(
            &format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_edges_owner \
                 ON edges(dst) WHERE rel_type IN ({OWNERSHIP_RELATIONS})"
            ),
            [],
        )?;

        // One container per package, folder, file and module
        self.conn.execute(
            &format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_edges_container \
                 ON edges(dst_label, dst) WHERE rel_type IN ({CONTAINMENT_RELATIONS})"
            ),
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_edges_src ON edges(src_label, src)",
            [],
        )?;

        debug!("Created edges table and indexes");
        Ok(())
    }
}
