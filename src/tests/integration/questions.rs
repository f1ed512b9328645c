//! Translated questions against an ingested graph

use crate::database::GraphStore;
use crate::query::{
    CommandTranslator, GraphQuestions, QueryError, QueryTranslator, TranslateError,
    clean_query_text,
};
use crate::tests::helpers::ingest_fixture;
use crate::tests::helpers::repo::mixed_repo;
use serde_json::json;

/// Stands in for a model: fixed output, cleaned like real output
struct CannedTranslator(&'static str);

impl QueryTranslator for CannedTranslator {
    fn translate(&self, _question: &str) -> Result<String, TranslateError> {
        clean_query_text(self.0)
    }
}

#[test]
fn test_methods_of_a_class() {
    let repo = mixed_repo("methods_of");
    ingest_fixture(&repo);
    let store = repo.open_reader();

    let translator = CannedTranslator(
        "```sql\nSELECT m.name AS name FROM edges e \
         JOIN nodes m ON m.label = e.dst_label AND m.qualified_name = e.dst \
         WHERE e.src = 'proj.pkg.shapes.Circle' AND e.rel_type = 'DEFINES_METHOD' \
         ORDER BY m.name\n```",
    );
    let answer = GraphQuestions::new(&store, &translator)
        .ask("What methods does Circle have?")
        .unwrap();

    assert_eq!(answer.question, "What methods does Circle have?");
    assert!(answer.query_used.ends_with("ORDER BY m.name;"));
    assert_eq!(
        answer.results,
        vec![
            json!({"name": "__init__"}).as_object().unwrap().clone(),
            json!({"name": "area"}).as_object().unwrap().clone(),
        ]
    );
    assert_eq!(answer.summary, "2 rows (name)");
}

#[test]
fn test_empty_result() {
    let repo = mixed_repo("empty_result");
    ingest_fixture(&repo);
    let store = repo.open_reader();

    let translator = CannedTranslator("SELECT name FROM nodes WHERE name = 'nothing'");
    let answer = GraphQuestions::new(&store, &translator)
        .ask("Is there anything called nothing?")
        .unwrap();
    assert!(answer.results.is_empty());
    assert_eq!(answer.summary, "No results.");
}

#[test]
fn test_invalid_query_is_a_store_error() {
    let repo = mixed_repo("invalid_query");
    ingest_fixture(&repo);
    let store = repo.open_reader();

    let translator = CannedTranslator("SELECT * FROM no_such_table");
    let result = GraphQuestions::new(&store, &translator).ask("anything");
    assert!(matches!(result, Err(QueryError::Store(_))));
}

#[test]
fn test_store_stays_unchanged_after_questions() {
    let repo = mixed_repo("read_only_questions");
    ingest_fixture(&repo);
    let store = repo.open_reader();

    // Passes the SELECT prefix check; the read-only connection still refuses it
    let translator = CannedTranslator(
        "WITH gone AS (SELECT 1) DELETE FROM nodes WHERE qualified_name IN (SELECT * FROM gone)",
    );
    assert!(GraphQuestions::new(&store, &translator).ask("delete?").is_err());

    let count = store.fetch_all("SELECT COUNT(*) AS count FROM nodes", &[]).unwrap();
    assert_eq!(count[0]["count"], json!(25));
}

#[cfg(unix)]
#[test]
fn test_command_translator_end_to_end() {
    let repo = mixed_repo("command_translator");
    ingest_fixture(&repo);
    let store = repo.open_reader();

    let argv: Vec<String> = [
        "sh",
        "-c",
        "cat >/dev/null; \
         printf '```sql\\nSELECT COUNT(*) AS modules FROM nodes WHERE label = %s\\n```' \
         \"'Module'\"",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let translator = CommandTranslator::new(&argv).unwrap();

    let answer = GraphQuestions::new(&store, &translator)
        .ask("How many modules are there?")
        .unwrap();
    assert_eq!(answer.results[0]["modules"], json!(5));
    assert_eq!(answer.summary, "1 row (modules)");
}
