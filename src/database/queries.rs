// Statements issued against the graph store

use super::GraphStore;
use super::helpers::row_i64;
use super::types::{GraphStats, StoreError};

pub const CLEAR_EDGES: &str = "DELETE FROM edges";
pub const CLEAR_NODES: &str = "DELETE FROM nodes";

pub const INSERT_NODE: &str = "INSERT INTO nodes \
     (label, qualified_name, name, path, impl_path, start_line, end_line, \
      docstring, language, extension, version_spec) \
     VALUES (:label, :qualified_name, :name, :path, :impl_path, :start_line, :end_line, \
      :docstring, :language, :extension, :version_spec)";

pub const INSERT_EDGE: &str = "INSERT INTO edges (src_label, src, rel_type, dst_label, dst) \
     VALUES (:src_label, :src, :rel_type, :dst_label, :dst)";

/// Exact-match lookup of a code entity with a single hop to its owner.
/// The entity's own `impl_path` wins, then the owner's `path`, then its own.
pub const FIND_DEFINITION: &str = "SELECT n.name AS name, \
            n.start_line AS start_line, \
            n.end_line AS end_line, \
            COALESCE(n.impl_path, o.path, n.path) AS path, \
            n.docstring AS docstring \
     FROM nodes n \
     LEFT JOIN edges e ON e.dst_label = n.label AND e.dst = n.qualified_name \
          AND e.rel_type IN ('DEFINES', 'DEFINES_METHOD') \
     LEFT JOIN nodes o ON o.label = e.src_label AND o.qualified_name = e.src \
     WHERE n.qualified_name = :qualified_name \
       AND n.label IN ('Module', 'Class', 'Function', 'Method') \
     LIMIT 1";

const COUNT_BY_LABEL: &str =
    "SELECT label, COUNT(*) AS count FROM nodes GROUP BY label ORDER BY label";

const COUNT_EDGES: &str = "SELECT COUNT(*) AS count FROM edges";

const COUNT_ORPHANS: &str = "SELECT COUNT(*) AS count FROM nodes n \
     WHERE n.label IN ('Class', 'Function', 'Method') \
       AND NOT EXISTS (SELECT 1 FROM edges e \
                       WHERE e.dst_label = n.label AND e.dst = n.qualified_name \
                         AND e.rel_type IN ('DEFINES', 'DEFINES_METHOD'))";

const COUNT_UNCONTAINED: &str = "SELECT COUNT(*) AS count FROM nodes n \
     WHERE n.label IN ('Package', 'Folder', 'File', 'Module') \
       AND NOT EXISTS (SELECT 1 FROM edges e \
                       WHERE e.dst_label = n.label AND e.dst = n.qualified_name \
                         AND e.rel_type IN ('CONTAINS_PACKAGE', 'CONTAINS_SUBPACKAGE', \
                             'CONTAINS_FOLDER', 'CONTAINS_MODULE', 'CONTAINS_FILE'))";

/// Node, edge and integrity counts for the whole graph
pub fn graph_stats(store: &dyn GraphStore) -> Result<GraphStats, StoreError> {
    let mut stats = GraphStats::default();

    for row in store.fetch_all(COUNT_BY_LABEL, &[])? {
        let count = row_i64(&row, "count").unwrap_or(0);
        match row.get("label").and_then(|v| v.as_str()) {
            Some("Project") => stats.projects = count,
            Some("Package") => stats.packages = count,
            Some("Folder") => stats.folders = count,
            Some("File") => stats.files = count,
            Some("Module") => stats.modules = count,
            Some("Class") => stats.classes = count,
            Some("Function") => stats.functions = count,
            Some("Method") => stats.methods = count,
            Some("ExternalPackage") => stats.external_packages = count,
            _ => {}
        }
    }

    stats.edges = scalar(store, COUNT_EDGES)?;
    stats.orphans = scalar(store, COUNT_ORPHANS)?;
    stats.uncontained = scalar(store, COUNT_UNCONTAINED)?;
    Ok(stats)
}

fn scalar(store: &dyn GraphStore, statement: &str) -> Result<i64, StoreError> {
    Ok(store
        .fetch_all(statement, &[])?
        .first()
        .and_then(|row| row_i64(row, "count"))
        .unwrap_or(0))
}
