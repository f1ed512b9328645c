pub mod repo;
pub mod tempdir;

pub use repo::{FixtureRepo, ingest_fixture};
pub use tempdir::unique_temp_dir;
