
use super::*;
use crate::types::{TaskRequest, TaskRecord};
use tempfile::TempDir;

/// A store backed by JSON files in a fresh temp directory
///
/// The `TempDir` must be kept alive for the duration of the test.
async fn json_store() -> (Store, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let backend = JsonFileStore::new(dir.path()).await.unwrap();
    (Store::new(Arc::new(backend)), dir)
}

fn info_task(key_name: &str) -> TaskRecord {
    TaskRecord::new(
        key_name,
        TaskRequest::FetchInfo {
            url: "https://example.com/watch?v=abc".into(),
        },
        None,
    )
}
