// src/store/json_file.rs
//! Durable store: one JSON document, rewritten atomically (tmp + rename) on
//! every save. Loaded once at open; a corrupt document fails the open.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::ingest::types::PersistedRecord;
use crate::store::{newest_first, Storage};

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Document {
    version: u32,
    records: Vec<PersistedRecord>,
}

pub struct JsonFileStore {
    path: PathBuf,
    records: Mutex<HashMap<String, PersistedRecord>>,
}

impl JsonFileStore {
    /// Open `path`, creating nothing until the first save.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(|b| b.is_ascii_whitespace()) => HashMap::new(),
            Ok(bytes) => {
                let doc: Document = serde_json::from_slice(&bytes)
                    .with_context(|| format!("corrupt store file {}", path.display()))?;
                doc.records
                    .into_iter()
                    .map(|r| (r.url().to_string(), r))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("reading store file {}", path.display()))
            }
        };
        tracing::info!(
            target: "funnel",
            path = %path.display(),
            records = records.len(),
            "store opened"
        );
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    async fn flush(&self, records: &HashMap<String, PersistedRecord>) -> Result<()> {
        let mut list: Vec<PersistedRecord> = records.values().cloned().collect();
        list.sort_by(|a, b| a.url().cmp(b.url()));
        let doc = Document {
            version: FORMAT_VERSION,
            records: list,
        };
        let json = serde_json::to_vec_pretty(&doc).context("serializing store")?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating store dir {}", dir.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let mut f = tokio::fs::File::create(&tmp)
            .await
            .with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(&json).await?;
        f.flush().await?;
        f.sync_all().await?;
        drop(f);
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("moving {} -> {}", tmp.display(), self.path.display()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Storage for JsonFileStore {
    async fn save(&self, record: &PersistedRecord) -> Result<()> {
        let mut guard = self.records.lock().await;
        let prev = guard.insert(record.url().to_string(), record.clone());
        if let Err(e) = self.flush(&guard).await {
            // Keep memory and disk in step.
            match prev {
                Some(p) => guard.insert(record.url().to_string(), p),
                None => guard.remove(record.url()),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn is_new(&self, url: &str) -> Result<bool> {
        Ok(!self.records.lock().await.contains_key(url))
    }

    async fn get_recent(&self, limit: usize) -> Result<Vec<PersistedRecord>> {
        let all: Vec<PersistedRecord> = self.records.lock().await.values().cloned().collect();
        Ok(newest_first(all, limit))
    }
}
