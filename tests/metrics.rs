// tests/metrics.rs
//
// Prometheus exporter: recorder installs once, /metrics renders the
// pipeline series after a funnel pass.

use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use tower::ServiceExt;

use bountyfeed::analyze::Scorer;
use bountyfeed::heuristics::Heuristics;
use bountyfeed::ingest::funnel::Funnel;
use bountyfeed::metrics::Metrics;
use bountyfeed::notify::BroadcastSink;
use bountyfeed::store::MemoryStore;
use bountyfeed::{CandidateRecord, PaymentKind};

fn rec(url: &str) -> CandidateRecord {
    CandidateRecord {
        source_id: "github".into(),
        external_id: url.into(),
        title: "Fix bug".into(),
        description: String::new(),
        source_url: url.into(),
        created_at: Utc::now(),
        expires_at: None,
        payment_amount: "5".into(),
        payment_currency: "USDC".into(),
        payment_kind: PaymentKind::Crypto,
        tags: vec![],
        origin: "GITHUB/BOUNTY".into(),
    }
}

#[tokio::test]
async fn metrics_endpoint_contains_funnel_series() {
    let metrics = Metrics::init().expect("first init");
    // Second init reuses the installed recorder.
    let again = Metrics::init().expect("second init");

    let funnel = Funnel::new(
        Arc::new(MemoryStore::new()),
        Arc::new(BroadcastSink::new(4, 1_000)),
        Scorer::new(Arc::new(Heuristics::default())),
    );
    let now = Utc::now();
    funnel.process(rec("https://x.io/m1"), now).await;
    funnel.process(rec("https://x.io/m1"), now).await;
    funnel.process(rec("javascript:void(0)"), now).await;

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "funnel_persisted_total",
        "funnel_duplicates_total",
        "funnel_rejected_total",
    ] {
        assert!(text.contains(needle), "missing {needle} in:\n{text}");
    }
    assert!(again.handle.render().contains("funnel_persisted_total"));
}
