// tests/funnel_dedup.rs
//
// Funnel gate: unsafe URLs rejected, URL dedup keeps the first record,
// sanitization before storage, broadcast of every persisted record.

mod support;

use std::sync::Arc;

use chrono::{Duration, Utc};

use bountyfeed::analyze::Scorer;
use bountyfeed::heuristics::Heuristics;
use bountyfeed::ingest::funnel::{Funnel, FunnelOutcome};
use bountyfeed::notify::BroadcastSink;
use bountyfeed::store::{MemoryStore, Storage};
use bountyfeed::Rejection;
use support::candidate;

fn funnel(store: Arc<MemoryStore>, sink: Arc<BroadcastSink>) -> Funnel {
    Funnel::new(store, sink, Scorer::new(Arc::new(Heuristics::default())))
}

#[tokio::test]
async fn unsafe_urls_are_rejected_before_storage() {
    let store = Arc::new(MemoryStore::new());
    let f = funnel(store.clone(), Arc::new(BroadcastSink::new(8, 60)));
    let now = Utc::now();

    for url in [
        "javascript:alert(1)",
        "ftp://files.example.com/x",
        "http://localhost:8080/a",
        "http://127.0.0.1/a",
        "http://[::1]/a",
        "   ",
    ] {
        let out = f.process(candidate(url, "Fix bug", "USDC", now), now).await;
        assert!(
            matches!(out, FunnelOutcome::Rejected(Rejection::InvalidRecord(_))),
            "{url:?} -> {out:?}"
        );
    }
    assert_eq!(store.len().await, 0);
}

#[tokio::test]
async fn second_record_with_same_url_is_duplicate() {
    let store = Arc::new(MemoryStore::new());
    let f = funnel(store.clone(), Arc::new(BroadcastSink::new(8, 60)));
    let now = Utc::now();
    let url = "https://github.com/acme/repo/issues/1";

    let first = f.process(candidate(url, "Fix bug", "USDC", now), now).await;
    let FunnelOutcome::Persisted(saved) = first else {
        panic!("expected persisted, got {first:?}");
    };

    let later = now + Duration::minutes(5);
    let again = f
        .process(candidate(url, "Completely different title", "PAYPAL", later), later)
        .await;
    assert_eq!(again, FunnelOutcome::Duplicate);

    assert_eq!(store.len().await, 1);
    let stored = store.get(url).await.expect("stored record");
    assert_eq!(stored, saved);
    assert_eq!(stored.record.title, "Fix bug");
    assert_eq!(stored.record.payment_currency, "USDC");
    assert_eq!(stored.persisted_at, now);
}

#[tokio::test]
async fn canonical_form_is_the_dedup_key() {
    let store = Arc::new(MemoryStore::new());
    let f = funnel(store.clone(), Arc::new(BroadcastSink::new(8, 60)));
    let now = Utc::now();

    let out = f
        .process(candidate("  https://x.io/a). trailing", "Fix bug", "USDC", now), now)
        .await;
    let FunnelOutcome::Persisted(p) = out else {
        panic!("expected persisted, got {out:?}");
    };
    assert_eq!(p.record.source_url, "https://x.io/a");

    let dup = f.process(candidate("https://x.io/a", "Fix bug", "USDC", now), now).await;
    assert_eq!(dup, FunnelOutcome::Duplicate);
}

#[tokio::test]
async fn text_fields_are_sanitized_and_blank_titles_rejected() {
    let store = Arc::new(MemoryStore::new());
    let f = funnel(store.clone(), Arc::new(BroadcastSink::new(8, 60)));
    let now = Utc::now();

    let mut rec = candidate("https://x.io/long", "Fix\n\tthe   bug", "USDC", now);
    rec.description = "d".repeat(1500);
    let FunnelOutcome::Persisted(p) = f.process(rec, now).await else {
        panic!("expected persisted");
    };
    assert_eq!(p.record.title, "Fix the bug");
    assert_eq!(p.record.description.chars().count(), 1003);
    assert!(p.record.description.ends_with("..."));

    let blank = candidate("https://x.io/blank", " \n\t ", "USDC", now);
    let out = f.process(blank, now).await;
    assert!(matches!(out, FunnelOutcome::Rejected(Rejection::InvalidRecord(_))));
    assert!(store.get("https://x.io/blank").await.is_none());
}

#[tokio::test]
async fn every_persisted_record_is_broadcast_with_its_score() {
    let store = Arc::new(MemoryStore::new());
    // Threshold above anything this record can reach; broadcast still happens.
    let sink = Arc::new(BroadcastSink::new(8, 10_000));
    let mut rx = sink.subscribe();
    let f = funnel(store.clone(), sink);
    let now = Utc::now();

    let out = f
        .process(candidate("https://x.io/b", "Urgent: Fix Security Bug", "USDC", now), now)
        .await;
    let FunnelOutcome::Persisted(p) = out else {
        panic!("expected persisted");
    };

    let got = rx.try_recv().expect("broadcast delivered");
    assert_eq!(got, p);
    assert!(got.score >= 160, "score {}", got.score);
    let stored = store.get_recent(10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].score, got.score);
}
