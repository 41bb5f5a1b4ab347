// src/ingest/funnel.rs
//! Per-record gate between the scan queue and storage.
//!
//! canonicalize → safety check → (reachability) → sanitize → dedup → score →
//! persist → broadcast. The funnel is the only writer, so the dedup check and
//! the save act as one step per record.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::analyze::Scorer;
use crate::error::Rejection;
use crate::ingest::types::{CandidateRecord, PersistedRecord};
use crate::ingest::url_guard::{is_safe_url, ReachabilityProbe};
use crate::ingest::{canonicalize_url, record_fingerprint, sanitize_text, MAX_TEXT_CHARS};
use crate::notify::BroadcastSink;
use crate::store::Storage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunnelOutcome {
    Persisted(PersistedRecord),
    /// URL already stored; nothing written.
    Duplicate,
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FunnelStats {
    pub persisted: u64,
    pub duplicates: u64,
    pub rejected: u64,
}

pub struct Funnel {
    store: Arc<dyn Storage>,
    sink: Arc<BroadcastSink>,
    scorer: Scorer,
    probe: Option<ReachabilityProbe>,
    allow_local: bool,
    max_text: usize,
}

impl Funnel {
    pub fn new(store: Arc<dyn Storage>, sink: Arc<BroadcastSink>, scorer: Scorer) -> Self {
        Self {
            store,
            sink,
            scorer,
            probe: None,
            allow_local: false,
            max_text: MAX_TEXT_CHARS,
        }
    }

    pub fn with_probe(mut self, probe: Option<ReachabilityProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn allow_local_urls(mut self, allow: bool) -> Self {
        self.allow_local = allow;
        self
    }

    pub async fn process(&self, rec: CandidateRecord, now: DateTime<Utc>) -> FunnelOutcome {
        let url = canonicalize_url(&rec.source_url);
        let outcome = self.gate(rec, url.clone(), now).await;
        let fp = record_fingerprint(&url);
        match &outcome {
            FunnelOutcome::Persisted(p) => {
                counter!("funnel_persisted_total").increment(1);
                tracing::info!(
                    target: "funnel",
                    fp = %fp,
                    score = p.score,
                    origin = %p.record.origin,
                    url = %url,
                    "persisted"
                );
            }
            FunnelOutcome::Duplicate => {
                counter!("funnel_duplicates_total").increment(1);
                tracing::trace!(target: "funnel", fp = %fp, "duplicate");
            }
            FunnelOutcome::Rejected(why) => {
                counter!("funnel_rejected_total").increment(1);
                tracing::debug!(target: "funnel", fp = %fp, reason = %why, "rejected");
            }
        }
        outcome
    }

    async fn gate(&self, rec: CandidateRecord, url: String, now: DateTime<Utc>) -> FunnelOutcome {
        if url.is_empty() {
            return FunnelOutcome::Rejected(Rejection::InvalidRecord("empty url".into()));
        }
        if let Err(reason) = is_safe_url(&url, self.allow_local) {
            return FunnelOutcome::Rejected(Rejection::InvalidRecord(reason));
        }
        if let Some(probe) = &self.probe {
            if !probe.is_reachable(&url).await {
                return FunnelOutcome::Rejected(Rejection::Unreachable(url));
            }
        }

        let rec = CandidateRecord {
            title: sanitize_text(&rec.title, self.max_text),
            description: sanitize_text(&rec.description, self.max_text),
            payment_amount: sanitize_text(&rec.payment_amount, self.max_text),
            payment_currency: sanitize_text(&rec.payment_currency, self.max_text),
            origin: sanitize_text(&rec.origin, self.max_text),
            source_url: url,
            ..rec
        };
        if rec.title.is_empty() {
            return FunnelOutcome::Rejected(Rejection::InvalidRecord("empty title".into()));
        }

        match self.store.is_new(&rec.source_url).await {
            Ok(true) => {}
            Ok(false) => return FunnelOutcome::Duplicate,
            Err(e) => return FunnelOutcome::Rejected(Rejection::Storage(format!("{e:#}"))),
        }

        let score = self.scorer.score(&rec, now);
        let persisted = PersistedRecord {
            record: rec,
            score,
            persisted_at: now,
        };
        if let Err(e) = self.store.save(&persisted).await {
            return FunnelOutcome::Rejected(Rejection::Storage(format!("{e:#}")));
        }
        self.sink.publish(&persisted).await;
        FunnelOutcome::Persisted(persisted)
    }

    /// Drain the scan queue until it closes or `cancel` fires.
    pub async fn run(
        &self,
        mut rx: mpsc::Receiver<CandidateRecord>,
        cancel: CancellationToken,
    ) -> FunnelStats {
        let mut stats = FunnelStats::default();
        loop {
            let rec = tokio::select! {
                _ = cancel.cancelled() => break,
                msg = rx.recv() => match msg {
                    Some(r) => r,
                    None => break,
                },
            };
            match self.process(rec, Utc::now()).await {
                FunnelOutcome::Persisted(_) => stats.persisted += 1,
                FunnelOutcome::Duplicate => stats.duplicates += 1,
                FunnelOutcome::Rejected(_) => stats.rejected += 1,
            }
        }
        tracing::info!(
            target: "funnel",
            persisted = stats.persisted,
            duplicates = stats.duplicates,
            rejected = stats.rejected,
            "funnel stopped"
        );
        stats
    }
}
