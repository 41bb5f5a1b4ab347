// src/notify/mod.rs
//! Fan-out of persisted records.
//!
//! Every persisted record goes to the in-process broadcast channel; records at
//! or above `min_score` additionally go to each alert channel. Channel errors
//! are logged and counted, never returned to the funnel.

pub mod discord;

use std::sync::Arc;

use anyhow::Result;
use metrics::counter;
use tokio::sync::broadcast;

use crate::ingest::record_fingerprint;
use crate::ingest::types::PersistedRecord;

pub use discord::DiscordNotifier;

/// An alert channel.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn alert(&self, record: &PersistedRecord) -> Result<()>;
}

/// Writes alerts to the log (always on).
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn alert(&self, r: &PersistedRecord) -> Result<()> {
        let reward = format!("{} {}", r.record.payment_amount, r.record.payment_currency);
        tracing::info!(
            target: "notify",
            score = r.score,
            origin = %r.record.origin,
            reward = %reward.trim(),
            title = %r.record.title,
            url = %r.record.source_url,
            "high-priority bounty"
        );
        Ok(())
    }
}

pub struct BroadcastSink {
    tx: broadcast::Sender<PersistedRecord>,
    notifiers: Vec<Arc<dyn Notifier>>,
    min_score: i64,
}

impl BroadcastSink {
    pub fn new(capacity: usize, min_score: i64) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            notifiers: Vec::new(),
            min_score,
        }
    }

    pub fn with_notifier(mut self, n: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(n);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PersistedRecord> {
        self.tx.subscribe()
    }

    pub async fn publish(&self, record: &PersistedRecord) {
        // No subscribers is fine.
        let _ = self.tx.send(record.clone());

        if record.score < self.min_score {
            return;
        }
        for n in &self.notifiers {
            match n.alert(record).await {
                Ok(()) => {
                    counter!("notify_sent_total", "channel" => n.name()).increment(1);
                }
                Err(e) => {
                    tracing::warn!(
                        target: "notify",
                        channel = n.name(),
                        fp = %record_fingerprint(record.url()),
                        error = ?e,
                        "alert failed"
                    );
                }
            }
        }
    }
}
