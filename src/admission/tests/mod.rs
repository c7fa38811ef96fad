
use super::*;
use crate::config::{QuotaConfig, RetentionConfig};
use crate::store::JsonFileStore;
use crate::types::TaskRequest;
use std::sync::Arc;
use tempfile::TempDir;

const MIB: u64 = 1024 * 1024;

/// Controller with a 3-task request limit and a 100 MiB / 10 minute memory quota
async fn controller() -> (AdmissionController, Store, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let backend = JsonFileStore::new(dir.path()).await.unwrap();
    let store = Store::new(Arc::new(backend));

    let quota = QuotaConfig {
        request_limit: 3,
        memory_limit_bytes: 100 * MIB,
        memory_window: Duration::from_secs(600),
    };
    let controller = AdmissionController::new(store.clone(), quota, &RetentionConfig::default());
    (controller, store, dir)
}

async fn insert_task(store: &Store, key_name: &str) {
    let record = TaskRecord::new(
        key_name,
        TaskRequest::FetchInfo {
            url: "https://example.com".into(),
        },
        None,
    );
    store.tasks.insert(record.id, record).await.unwrap();
}
