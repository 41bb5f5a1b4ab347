// src/store/mod.rs
//! Persistence for scored records, keyed by canonical URL.

pub mod json_file;
pub mod memory;

use anyhow::Result;

use crate::ingest::types::PersistedRecord;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// Upsert by `record.source_url`.
    async fn save(&self, record: &PersistedRecord) -> Result<()>;
    /// True when no record with this canonical URL is stored.
    async fn is_new(&self, url: &str) -> Result<bool>;
    /// Newest `created_at` first.
    async fn get_recent(&self, limit: usize) -> Result<Vec<PersistedRecord>>;
}

/// Newest first; ties broken by persist time, then URL for a stable order.
pub(crate) fn newest_first(mut v: Vec<PersistedRecord>, limit: usize) -> Vec<PersistedRecord> {
    v.sort_by(|a, b| {
        b.record
            .created_at
            .cmp(&a.record.created_at)
            .then(b.persisted_at.cmp(&a.persisted_at))
            .then(a.url().cmp(b.url()))
    });
    v.truncate(limit);
    v
}
