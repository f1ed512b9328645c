/// Uniquely named temporary directories for parallel test runs
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::TempDir;

static TEMP_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Create a temp directory whose name carries the test name and a counter
pub fn unique_temp_dir(test_name: &str) -> TempDir {
    let counter = TEMP_DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    let unique_name = format!("codegraph_test_{}_{}", test_name, counter);

    tempfile::Builder::new()
        .prefix(&unique_name)
        .tempdir()
        .expect("Failed to create unique temp directory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_temp_dirs_are_different() {
        let dir1 = unique_temp_dir("test");
        let dir2 = unique_temp_dir("test");
        assert_ne!(dir1.path(), dir2.path());
        assert!(dir1.path().exists());
    }
}
