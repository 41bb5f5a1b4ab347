// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Payment tier as inferred by an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Crypto,
    P2p,
    Fiat,
    #[default]
    Unknown,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Crypto => "crypto",
            PaymentKind::P2p => "p2p",
            PaymentKind::Fiat => "fiat",
            PaymentKind::Unknown => "unknown",
        }
    }
}

/// One opportunity as emitted by a source adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateRecord {
    pub source_id: String,   // adapter name, e.g. "github"
    pub external_id: String, // source-local id (issue url, slug, hash)
    pub title: String,
    pub description: String,
    pub source_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub payment_amount: String,
    pub payment_currency: String,
    pub payment_kind: PaymentKind,
    /// Ordered; duplicates are kept.
    pub tags: Vec<String>,
    pub origin: String, // e.g. "GITHUB/BOUNTY", "SUPERTEAM"
}

/// Stored shape, keyed by the canonical `source_url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedRecord {
    #[serde(flatten)]
    pub record: CandidateRecord,
    pub score: i64,
    pub persisted_at: DateTime<Utc>,
}

impl PersistedRecord {
    pub fn url(&self) -> &str {
        &self.record.source_url
    }
}

/// A polled bounty source. `scan` returns a lazy stream; pages are fetched
/// as the stream is driven and the stream ends early on error or cancel.
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;
    fn scan<'a>(&'a self, cancel: CancellationToken) -> Result<BoxStream<'a, CandidateRecord>>;
}
