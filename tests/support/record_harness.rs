#![allow(dead_code)]

use std::sync::Arc;

use mindstore::config::StorageConfig;
use mindstore::{ManualClock, MemoryRecordStore, RecordManager, RecordStore, create_store};
use tempfile::TempDir;

pub const START_MS: i64 = 1_700_000_000_000;

pub struct Harness {
    pub manager: RecordManager,
    pub clock: Arc<ManualClock>,
    pub store: Arc<dyn RecordStore>,
}

pub fn memory_harness() -> Harness {
    let clock = Arc::new(ManualClock::new(START_MS));
    let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
    Harness {
        manager: RecordManager::new(store.clone(), clock.clone()),
        clock,
        store,
    }
}

pub async fn sqlite_harness(dir: &TempDir) -> Harness {
    let config = StorageConfig {
        backend: "sqlite".into(),
        path: dir.path().join("records.db").to_string_lossy().into_owned(),
    };
    let store = create_store(&config).await.expect("sqlite store");
    let clock = Arc::new(ManualClock::new(START_MS));
    Harness {
        manager: RecordManager::new(store.clone(), clock.clone()),
        clock,
        store,
    }
}
