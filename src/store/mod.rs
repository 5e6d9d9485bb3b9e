//! Storage port for record bytes.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryRecordStore;
pub use sqlite::SqliteRecordStore;

use crate::config::StorageConfig;
use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePoolOptions;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

/// Async byte-level persistence contract for records.
///
/// One key maps to one small JSON document. Implementations must make each
/// call atomic; per-player serialization lives above this port, in the
/// record manager.
pub trait RecordStore: Send + Sync {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>>> + Send + 'a>>;

    fn put<'a>(
        &'a self,
        key: &'a str,
        value: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Factory: create the right store backend from config.
pub async fn create_store(config: &StorageConfig) -> Result<Arc<dyn RecordStore>> {
    match config.backend.as_str() {
        "sqlite" => {
            let path = config.expanded_path();
            if let Some(parent) = Path::new(&path).parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create data dir {}", parent.display()))?;
            }
            // SQLite allows one writer at a time; a single connection keeps
            // cross-player writes queued instead of failing with SQLITE_BUSY.
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect(&format!("sqlite://{path}?mode=rwc"))
                .await
                .with_context(|| format!("open sqlite database at {path}"))?;
            Ok(Arc::new(SqliteRecordStore::new(pool).await?))
        }
        "memory" => Ok(Arc::new(MemoryRecordStore::new())),
        other => {
            tracing::warn!("Unknown storage backend '{other}', falling back to memory");
            Ok(Arc::new(MemoryRecordStore::new()))
        }
    }
}
