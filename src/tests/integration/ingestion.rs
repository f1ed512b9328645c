//! Full rebuild ingestion against on-disk fixture repositories

use crate::database::{GraphStore, Row, StoreError, graph_stats};
use crate::extractors::LanguageRegistry;
use crate::ingest::{GraphIngestor, IngestError, ingest_repository};
use crate::tests::helpers::repo::mixed_repo;
use crate::tests::helpers::{FixtureRepo, ingest_fixture};
use serde_json::json;
use std::fs;

fn all_nodes(store: &dyn GraphStore) -> Vec<Row> {
    store
        .fetch_all(
            "SELECT label, qualified_name, path, impl_path, start_line, end_line \
             FROM nodes ORDER BY label, qualified_name",
            &[],
        )
        .unwrap()
}

fn code_names(store: &dyn GraphStore) -> Vec<String> {
    store
        .fetch_all(
            "SELECT qualified_name FROM nodes \
             WHERE label IN ('Module', 'Class', 'Function', 'Method') \
             ORDER BY qualified_name",
            &[],
        )
        .unwrap()
        .into_iter()
        .map(|row| row["qualified_name"].as_str().unwrap().to_string())
        .collect()
}

fn owner_of(store: &dyn GraphStore, qualified_name: &str) -> Vec<(String, String)> {
    store
        .fetch_all(
            "SELECT src, rel_type FROM edges \
             WHERE dst = :qn AND rel_type IN ('DEFINES', 'DEFINES_METHOD')",
            &[("qn", json!(qualified_name))],
        )
        .unwrap()
        .into_iter()
        .map(|row| {
            (
                row["src"].as_str().unwrap().to_string(),
                row["rel_type"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

/// `(src_label, src, rel_type)` of every edge into the node
fn containers_of(store: &dyn GraphStore, label: &str, key: &str) -> Vec<(String, String, String)> {
    store
        .fetch_all(
            "SELECT src_label, src, rel_type FROM edges \
             WHERE dst_label = :label AND dst = :key ORDER BY rel_type",
            &[("label", json!(label)), ("key", json!(key))],
        )
        .unwrap()
        .into_iter()
        .map(|row| {
            (
                row["src_label"].as_str().unwrap().to_string(),
                row["src"].as_str().unwrap().to_string(),
                row["rel_type"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

fn edge(src_label: &str, src: &str, rel_type: &str) -> (String, String, String) {
    (src_label.to_string(), src.to_string(), rel_type.to_string())
}

#[test]
fn test_mixed_repository_builds_one_graph() {
    let repo = mixed_repo("mixed");
    let report = ingest_fixture(&repo);

    assert_eq!(report.files_discovered, 5);
    assert_eq!(report.files_parsed, 5);
    assert!(report.skipped.is_empty());
    assert_eq!(report.packages, 1);
    assert_eq!(report.folders, 2);
    assert_eq!(report.file_nodes, 6, "README.md is a file node too");
    assert_eq!(report.modules, 5);
    assert_eq!(report.types, 3);
    assert_eq!(report.functions, 3);
    assert_eq!(report.methods, 4);
    assert_eq!(report.external_packages, 0);
    // 10 ownership, 3 directory, 6 file and 5 module containment edges
    assert_eq!(report.edges, 24);
    assert_eq!(report.duplicates, 0);

    let store = repo.open_reader();
    let stats = graph_stats(&store).unwrap();
    assert_eq!(stats.projects, 1);
    assert_eq!(stats.packages, 1);
    assert_eq!(stats.folders, 2);
    assert_eq!(stats.files, 6);
    assert_eq!(stats.modules, 5);
    assert_eq!(stats.classes, 3);
    assert_eq!(stats.functions, 3);
    assert_eq!(stats.methods, 4);
    assert_eq!(stats.edges, 24);
    assert_eq!(stats.orphans, 0, "every class, function and method has an owner");
    assert_eq!(stats.uncontained, 0, "every module, file and directory has a container");
}

#[test]
fn test_directories_become_packages_and_folders() {
    let repo = mixed_repo("containment");
    ingest_fixture(&repo);
    let store = repo.open_reader();

    assert_eq!(
        containers_of(&store, "Package", "proj.pkg"),
        vec![edge("Project", "proj", "CONTAINS_PACKAGE")]
    );
    assert_eq!(
        containers_of(&store, "Folder", "math"),
        vec![edge("Project", "proj", "CONTAINS_FOLDER")]
    );
    assert_eq!(
        containers_of(&store, "Module", "proj.pkg.shapes"),
        vec![edge("Package", "proj.pkg", "CONTAINS_MODULE")]
    );
    assert_eq!(
        containers_of(&store, "Module", "math/vec.cc"),
        vec![edge("Folder", "math", "CONTAINS_MODULE")]
    );
    assert_eq!(
        containers_of(&store, "File", "README.md"),
        vec![edge("Project", "proj", "CONTAINS_FILE")]
    );

    let files = store
        .fetch_all(
            "SELECT name, extension FROM nodes WHERE label = 'File' AND qualified_name = :key",
            &[("key", json!("src/counter.rs"))],
        )
        .unwrap();
    assert_eq!(files[0]["name"], json!("counter.rs"));
    assert_eq!(files[0]["extension"], json!(".rs"));
}

#[test]
fn test_nested_packages_and_declared_dependencies() {
    let repo = FixtureRepo::new("pyproject");
    repo.write("app/__init__.py", "")
        .write("app/core/__init__.py", "")
        .write("app/core/engine.py", "def start():\n    pass\n")
        .write(
            "pyproject.toml",
            "[project]\nname = \"app\"\ndependencies = [\"requests>=2.31\", \"numpy\"]\n",
        );

    let report = ingest_fixture(&repo);
    assert_eq!(report.packages, 2);
    assert_eq!(report.external_packages, 2);

    let store = repo.open_reader();
    assert_eq!(
        containers_of(&store, "Package", "proj.app.core"),
        vec![edge("Package", "proj.app", "CONTAINS_SUBPACKAGE")]
    );
    assert_eq!(
        containers_of(&store, "ExternalPackage", "requests"),
        vec![edge("Project", "proj", "DEPENDS_ON_EXTERNAL")]
    );

    let rows = store
        .fetch_all(
            "SELECT version_spec FROM nodes WHERE label = 'ExternalPackage' ORDER BY name",
            &[],
        )
        .unwrap();
    assert_eq!(rows[0]["version_spec"], json!(""));
    assert_eq!(rows[1]["version_spec"], json!(">=2.31"));
    assert_eq!(graph_stats(&store).unwrap().uncontained, 0);
}

#[test]
fn test_unreadable_pyproject_is_skipped() {
    let repo = FixtureRepo::new("bad_pyproject");
    repo.write("main.py", "def run():\n    pass\n")
        .write("pyproject.toml", "[project\n");

    let report = ingest_fixture(&repo);
    assert_eq!(report.external_packages, 0);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].path, "pyproject.toml");
    assert_eq!(report.modules, 1);
}

#[test]
fn test_header_declaration_and_source_definition_merge() {
    let repo = mixed_repo("merge");
    ingest_fixture(&repo);
    let store = repo.open_reader();

    assert_eq!(
        owner_of(&store, "Vec3::dot"),
        vec![("Vec3".to_string(), "DEFINES_METHOD".to_string())]
    );
    assert_eq!(
        owner_of(&store, "Vec3"),
        vec![("math/vec.h".to_string(), "DEFINES".to_string())]
    );

    let rows = store
        .fetch_all(
            "SELECT label, impl_path, start_line, end_line FROM nodes \
             WHERE qualified_name = 'Vec3::dot'",
            &[],
        )
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["label"], json!("Method"));
    assert_eq!(rows[0]["impl_path"], json!("math/vec.cc"));
    assert_eq!(rows[0]["start_line"], json!(10));
    assert_eq!(rows[0]["end_line"], json!(14));
}

#[test]
fn test_python_and_rust_names_carry_the_project() {
    let repo = mixed_repo("names");
    ingest_fixture(&repo);
    let store = repo.open_reader();

    assert_eq!(
        owner_of(&store, "proj.pkg.shapes.Circle.area"),
        vec![("proj.pkg.shapes.Circle".to_string(), "DEFINES_METHOD".to_string())]
    );
    assert_eq!(
        owner_of(&store, "proj.pkg.shapes.unit"),
        vec![("proj.pkg.shapes".to_string(), "DEFINES".to_string())]
    );
    assert_eq!(
        owner_of(&store, "proj::counter::Counter::bump"),
        vec![("proj::counter::Counter".to_string(), "DEFINES_METHOD".to_string())]
    );

    let package = store
        .fetch_all(
            "SELECT path FROM nodes WHERE label = 'Module' AND qualified_name = 'proj.pkg'",
            &[],
        )
        .unwrap();
    assert_eq!(package[0]["path"], json!("pkg/__init__.py"));
}

#[test]
fn test_reingest_is_idempotent() {
    let repo = mixed_repo("idempotent");
    let first = ingest_fixture(&repo);
    let before = all_nodes(&repo.open_reader());

    let second = ingest_fixture(&repo);
    let after = all_nodes(&repo.open_reader());

    assert_eq!(before, after);
    assert_eq!(first.edges, second.edges);
}

#[test]
fn test_rebuild_drops_entities_of_deleted_files() {
    let repo = mixed_repo("rebuild");
    ingest_fixture(&repo);

    repo.remove("src/counter.rs");
    let report = ingest_fixture(&repo);
    assert_eq!(report.files_discovered, 4);

    let store = repo.open_reader();
    let rows = store
        .fetch_all(
            "SELECT qualified_name FROM nodes \
             WHERE qualified_name LIKE 'proj::counter%' OR qualified_name = 'src/counter.rs'",
            &[],
        )
        .unwrap();
    assert!(rows.is_empty(), "stale entities survived a rebuild: {rows:?}");
    assert_eq!(graph_stats(&store).unwrap().orphans, 0);
}

#[test]
fn test_bad_files_do_not_abort_the_run() {
    let repo = FixtureRepo::new("bad_files");
    repo.write("good.py", "def fine():\n    return 1\n")
        .write("broken.py", "def broken(:\n    pass\n\nclass Ok:\n    pass\n");
    let latin1 = [0x64, 0x65, 0x66, 0x20, 0xff, 0xfe, 0x0a];
    fs::write(repo.root().join("latin.py"), latin1).unwrap();

    let report = ingest_fixture(&repo);

    assert_eq!(report.files_discovered, 3);
    assert_eq!(report.files_parsed, 2);
    assert_eq!(report.files_with_syntax_errors, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].path, "latin.py");
    assert_eq!(report.file_nodes, 3, "skipped files keep their file node");

    let store = repo.open_reader();
    let rows = store
        .fetch_all(
            "SELECT label FROM nodes WHERE qualified_name = 'proj.good.fine'",
            &[],
        )
        .unwrap();
    assert_eq!(rows[0]["label"], json!("Function"));
    assert_eq!(owner_of(&store, "proj.good.fine").len(), 1);
}

#[test]
fn test_ignored_directories_are_not_ingested() {
    let repo = FixtureRepo::new("ignored");
    repo.write("lib.py", "def keep():\n    pass\n")
        .write("node_modules/dep/index.py", "def skip():\n    pass\n")
        .write("build/gen.cc", "int skip() { return 0; }\n");

    let report = ingest_fixture(&repo);
    assert_eq!(report.files_discovered, 1);
    assert_eq!(report.modules, 1);
    assert_eq!(report.folders, 0);
}

#[test]
fn test_ingest_repository_uses_configured_store() {
    let repo = mixed_repo("configured");
    let config = repo.config();

    let report = ingest_repository(&config, repo.root()).unwrap();
    assert_eq!(report.root, repo.root().canonicalize().unwrap());
    assert!(repo.db_path().exists());

    let store = repo.open_reader();
    assert!(store.is_read_only());
    assert_eq!(graph_stats(&store).unwrap().total_nodes(), 25);
    assert!(matches!(
        store.execute("DELETE FROM nodes", &[]),
        Err(StoreError::ReadOnly)
    ));
}

#[test]
fn test_missing_root_is_an_error() {
    let repo = FixtureRepo::new("missing_root");
    let config = repo.config();
    let result = ingest_repository(&config, &repo.root().join("nope"));
    assert!(result.is_err());
}

#[test]
fn test_second_repository_replaces_the_first() {
    let first = mixed_repo("repo_a");
    ingest_fixture(&first);

    let second = FixtureRepo::new("repo_b");
    second.write("only.py", "def alone():\n    pass\n");

    // Same store, different repository
    let config = first.config();
    let registry = config.language_registry().unwrap();
    let store = first.open_store();
    GraphIngestor::new(&config, &registry)
        .ingest(&store, second.root())
        .unwrap();

    assert_eq!(code_names(&store), vec!["proj.only", "proj.only.alone"]);
}

#[test]
fn test_empty_registry_keeps_the_previous_graph() {
    let repo = mixed_repo("no_languages");
    ingest_fixture(&repo);
    let before = all_nodes(&repo.open_reader());

    let config = repo.config();
    let registry = LanguageRegistry::new();
    let store = repo.open_store();
    let result = GraphIngestor::new(&config, &registry).ingest(&store, repo.root());

    assert!(matches!(result, Err(IngestError::NoLanguages)));
    assert_eq!(all_nodes(&repo.open_reader()), before);
}

#[test]
fn test_unknown_language_keeps_the_previous_graph() {
    let repo = mixed_repo("unknown_language");
    ingest_fixture(&repo);
    let before = all_nodes(&repo.open_reader());

    let mut config = repo.config();
    config.ingest.languages = vec!["c++".to_string()];
    let result = ingest_repository(&config, repo.root());

    assert!(matches!(result, Err(IngestError::Config(_))));
    assert_eq!(all_nodes(&repo.open_reader()), before);
}

#[test]
fn test_locked_store_fails_and_keeps_the_previous_graph() {
    let repo = mixed_repo("locked");
    ingest_fixture(&repo);
    let before = graph_stats(&repo.open_reader()).unwrap();

    let mut config = repo.config();
    config.store.busy_timeout_ms = 50;

    let holder = repo.open_store();
    holder.begin_exclusive().unwrap();
    let result = ingest_repository(&config, repo.root());
    holder.rollback().unwrap();

    assert!(matches!(result, Err(IngestError::Store(_))), "{result:?}");
    assert_eq!(graph_stats(&repo.open_reader()).unwrap(), before);
}
