// src/store/memory.rs
use std::collections::HashMap;

use anyhow::Result;
use tokio::sync::RwLock;

use crate::ingest::types::PersistedRecord;
use crate::store::{newest_first, Storage};

/// Process-local store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, PersistedRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn get(&self, url: &str) -> Option<PersistedRecord> {
        self.records.read().await.get(url).cloned()
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStore {
    async fn save(&self, record: &PersistedRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.url().to_string(), record.clone());
        Ok(())
    }

    async fn is_new(&self, url: &str) -> Result<bool> {
        Ok(!self.records.read().await.contains_key(url))
    }

    async fn get_recent(&self, limit: usize) -> Result<Vec<PersistedRecord>> {
        let all: Vec<PersistedRecord> = self.records.read().await.values().cloned().collect();
        Ok(newest_first(all, limit))
    }
}
