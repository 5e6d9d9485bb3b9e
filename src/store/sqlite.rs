//! SQLite-backed record store.

use super::RecordStore;
use anyhow::{Context, Result, bail, ensure};
use chrono::Utc;
use sqlx::SqlitePool;
use std::future::Future;
use std::pin::Pin;

const RECORD_SCHEMA_VERSION_KEY: &str = "record_schema_version";
const RECORD_SCHEMA_VERSION: u32 = 1;

/// Persistent store keeping one row per record key.
#[derive(Debug)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

/// Enforce the record schema version before touching any data.
///
/// A database without version metadata that already contains a `records`
/// table predates versioning and is rejected rather than migrated.
async fn ensure_record_schema_version(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS record_schema_meta (
             key   TEXT PRIMARY KEY,
             value TEXT NOT NULL
         )",
    )
    .execute(pool)
    .await
    .context("create record_schema_meta table")?;

    let stored_version: Option<(String,)> =
        sqlx::query_as("SELECT value FROM record_schema_meta WHERE key = $1")
            .bind(RECORD_SCHEMA_VERSION_KEY)
            .fetch_optional(pool)
            .await
            .context("load record schema version")?;

    if let Some((value,)) = stored_version {
        let parsed = value
            .parse::<u32>()
            .with_context(|| format!("invalid record schema version value: {value}"))?;
        ensure!(
            parsed == RECORD_SCHEMA_VERSION,
            "incompatible record schema version: stored={parsed}, expected={RECORD_SCHEMA_VERSION}. \
Remove the records database and restart."
        );
        return Ok(());
    }

    let legacy_tables: (i64,) = sqlx::query_as(
        "SELECT COUNT(*)
         FROM sqlite_master
         WHERE type = 'table'
           AND name = 'records'",
    )
    .fetch_one(pool)
    .await
    .context("detect legacy record tables")?;

    if legacy_tables.0 > 0 {
        bail!(
            "legacy records database detected without schema version metadata. \
Remove the records database and restart."
        );
    }

    sqlx::query("INSERT INTO record_schema_meta (key, value) VALUES ($1, $2)")
        .bind(RECORD_SCHEMA_VERSION_KEY)
        .bind(RECORD_SCHEMA_VERSION.to_string())
        .execute(pool)
        .await
        .context("persist record schema version")?;

    Ok(())
}

impl SqliteRecordStore {
    /// Open the store over an existing pool, creating tables as needed.
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        ensure_record_schema_version(&pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS records (
                 key        TEXT PRIMARY KEY,
                 value      BLOB NOT NULL,
                 updated_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await
        .context("create records table")?;

        Ok(Self { pool })
    }
}

impl RecordStore for SqliteRecordStore {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>>> + Send + 'a>> {
        Box::pin(async move {
            let row: Option<(Vec<u8>,)> =
                sqlx::query_as("SELECT value FROM records WHERE key = $1")
                    .bind(key)
                    .fetch_optional(&self.pool)
                    .await
                    .context("load record")?;
            Ok(row.map(|(value,)| value))
        })
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        value: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO records (key, value, updated_at) VALUES ($1, $2, $3)
                 ON CONFLICT(key) DO UPDATE
                 SET value = excluded.value, updated_at = excluded.updated_at",
            )
            .bind(key)
            .bind(value)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .context("store record")?;
            Ok(())
        })
    }
}
