// codegraph test infrastructure
//
// Unit tests live next to the code they cover. The tests here build small
// repositories on disk and drive the full ingest -> store -> retrieve path.

// ============================================================================
// HELPERS - Fixture repositories and temp directories
// ============================================================================
pub mod helpers;

// ============================================================================
// INTEGRATION TESTS - End-to-end ingestion, retrieval and questions
// ============================================================================
pub mod integration {
    pub mod ingestion; // Full rebuilds, idempotence, graph integrity
    pub mod questions; // Translated questions against an ingested graph
    pub mod retrieval; // Snippet contract against an ingested graph
}
