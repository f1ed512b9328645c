//! Snippet retrieval against ingested fixture repositories

use crate::retrieval::{NOT_FOUND_MESSAGE, SnippetRetriever, find_snippet};
use crate::tests::helpers::ingest_fixture;
use crate::tests::helpers::repo::{COUNTER_RS, DOT_BODY, VEC_SOURCE, mixed_repo};
use std::fs;

#[test]
fn test_out_of_line_method_resolves_to_its_source_file() {
    let repo = mixed_repo("dot");
    ingest_fixture(&repo);
    let store = repo.open_reader();

    let snippet = SnippetRetriever::new(repo.root(), &store)
        .find_snippet("Vec3::dot")
        .unwrap();

    assert!(snippet.found, "{:?}", snippet.error_message);
    assert_eq!(snippet.qualified_name, "Vec3::dot");
    assert_eq!(snippet.file_path, "math/vec.cc");
    assert_eq!((snippet.line_start, snippet.line_end), (10, 14));
    assert_eq!(snippet.source_code, DOT_BODY);
    assert_eq!(snippet.error_message, None);
}

#[test]
fn test_snippet_is_exactly_the_recorded_lines() {
    let repo = mixed_repo("exact");
    ingest_fixture(&repo);
    let store = repo.open_reader();
    let retriever = SnippetRetriever::new(repo.root(), &store);

    let area = retriever.find_snippet("proj.pkg.shapes.Circle.area").unwrap();
    assert!(area.found);
    assert_eq!(area.file_path, "pkg/shapes.py");
    assert_eq!(
        area.source_code,
        "    def area(self):\n        return math.pi * self.r ** 2\n"
    );

    let circle = retriever.find_snippet("proj.pkg.shapes.Circle").unwrap();
    assert_eq!(circle.docstring.as_deref(), Some("A circle."));
    assert!(circle.source_code.starts_with("class Circle:\n"));

    let counter = retriever.find_snippet("proj::counter::Counter").unwrap();
    assert_eq!(counter.file_path, "src/counter.rs");
    assert_eq!(counter.docstring.as_deref(), Some("Counts things."));
    assert_eq!(
        counter.source_code,
        COUNTER_RS.lines().skip(1).take(3).map(|l| format!("{l}\n")).collect::<String>()
    );

    let module = retriever.find_snippet("math/vec.cc").unwrap();
    assert_eq!(module.source_code, VEC_SOURCE);
}

#[test]
fn test_unknown_names_are_not_found() {
    let repo = mixed_repo("unknown");
    ingest_fixture(&repo);
    let store = repo.open_reader();
    let retriever = SnippetRetriever::new(repo.root(), &store);

    for name in ["Nonexistent::symbol", "vec3::dot", "dot", ""] {
        let snippet = retriever.find_snippet(name).unwrap();
        assert!(!snippet.found, "{name} should not resolve");
        assert_eq!(snippet.error_message.as_deref(), Some(NOT_FOUND_MESSAGE));
        assert_eq!(snippet.source_code, "");
        assert_eq!(snippet.file_path, "");
        assert_eq!((snippet.line_start, snippet.line_end), (0, 0));
    }
}

#[test]
fn test_deleted_file_after_ingest() {
    let repo = mixed_repo("deleted");
    ingest_fixture(&repo);
    repo.remove("math/vec.cc");

    let store = repo.open_reader();
    let snippet = SnippetRetriever::new(repo.root(), &store)
        .find_snippet("Vec3::dot")
        .unwrap();

    assert!(!snippet.found);
    assert_eq!(snippet.file_path, "math/vec.cc");
    assert!(!snippet.error_message.unwrap_or_default().is_empty());
}

#[test]
fn test_edited_file_returns_current_lines() {
    let repo = mixed_repo("edited");
    ingest_fixture(&repo);

    let shifted = format!("// new first line\n{VEC_SOURCE}");
    fs::write(repo.root().join("math/vec.cc"), shifted).unwrap();

    let store = repo.open_reader();
    let snippet = SnippetRetriever::new(repo.root(), &store)
        .find_snippet("Vec3::dot")
        .unwrap();
    assert!(snippet.found);
    assert!(snippet.source_code.starts_with("\nfloat Vec3::dot"));
}

#[test]
fn test_find_snippet_opens_configured_store() {
    let repo = mixed_repo("configured_lookup");
    ingest_fixture(&repo);

    let snippet = find_snippet(&repo.config(), "proj.pkg.shapes.unit", repo.root()).unwrap();
    assert!(snippet.found);
    assert_eq!(snippet.source_code, "def unit():\n    return Circle(1)\n");
    assert_eq!((snippet.line_start, snippet.line_end), (14, 15));
}

#[test]
fn test_find_snippet_before_any_ingest() {
    let repo = mixed_repo("no_graph");
    assert!(find_snippet(&repo.config(), "Vec3::dot", repo.root()).is_err());
}

#[test]
fn test_lone_source_file_without_class_declaration() {
    let repo = crate::tests::helpers::FixtureRepo::new("lone_source");
    repo.write("math/vec.cc", VEC_SOURCE);
    let report = ingest_fixture(&repo);
    assert_eq!(report.demoted_methods, 1);

    let store = repo.open_reader();
    let snippet = SnippetRetriever::new(repo.root(), &store)
        .find_snippet("Vec3::dot")
        .unwrap();
    assert!(snippet.found);
    assert_eq!(snippet.file_path, "math/vec.cc");
    assert_eq!((snippet.line_start, snippet.line_end), (10, 14));
    assert_eq!(snippet.source_code, DOT_BODY);
}
