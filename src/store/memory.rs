//! In-process record store for tests and embedders.

use super::RecordStore;
use anyhow::Result;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

/// Volatile store keeping record bytes in a process-local map.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>>> + Send + 'a>> {
        Box::pin(async move {
            let entries = self
                .entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Ok(entries.get(key).cloned())
        })
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        value: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = self
                .entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            entries.insert(key.to_string(), value.to_vec());
            Ok(())
        })
    }
}
