// tests/reachability.rs
//
// ReachabilityProbe against a local mock: HEAD first, ranged GET when HEAD
// is refused, and the funnel dropping records whose link is dead.

mod support;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{HeaderMap, StatusCode},
    routing::get,
    Router,
};
use chrono::Utc;
use parking_lot::Mutex;

use bountyfeed::analyze::Scorer;
use bountyfeed::heuristics::Heuristics;
use bountyfeed::ingest::funnel::{Funnel, FunnelOutcome};
use bountyfeed::ingest::url_guard::ReachabilityProbe;
use bountyfeed::net::build_client;
use bountyfeed::notify::BroadcastSink;
use bountyfeed::store::MemoryStore;
use bountyfeed::Rejection;
use support::{candidate, spawn_mock};

/// Range headers seen by the GET fallbacks.
type Ranges = Arc<Mutex<Vec<String>>>;

fn ranged(ranges: Ranges, status: StatusCode) -> axum::routing::MethodRouter {
    get(move |headers: HeaderMap| {
        let ranges = ranges.clone();
        async move {
            let range = headers
                .get("range")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            ranges.lock().push(range.clone());
            if range == "bytes=0-0" {
                status
            } else {
                StatusCode::BAD_REQUEST
            }
        }
    })
    .head(|| async { StatusCode::METHOD_NOT_ALLOWED })
}

async fn mock() -> (String, Ranges) {
    let ranges: Ranges = Arc::default();
    let app = Router::new()
        .route("/ok", get(|| async { "hello" }))
        .route("/partial", ranged(ranges.clone(), StatusCode::PARTIAL_CONTENT))
        .route("/empty", ranged(ranges.clone(), StatusCode::RANGE_NOT_SATISFIABLE))
        .route("/gone", get(|| async { StatusCode::NOT_FOUND }));
    (spawn_mock(app).await, ranges)
}

fn probe() -> ReachabilityProbe {
    let timeout = Duration::from_secs(5);
    ReachabilityProbe::new(build_client(timeout).expect("http client"), timeout)
}

#[tokio::test]
async fn head_success_is_reachable() {
    let (base, ranges) = mock().await;
    assert!(probe().is_reachable(&format!("{base}/ok")).await);
    assert!(ranges.lock().is_empty());
}

#[tokio::test]
async fn refused_head_falls_back_to_ranged_get() {
    let (base, ranges) = mock().await;
    let p = probe();

    assert!(p.is_reachable(&format!("{base}/partial")).await);
    assert!(p.is_reachable(&format!("{base}/empty")).await);
    assert_eq!(*ranges.lock(), vec!["bytes=0-0", "bytes=0-0"]);
}

#[tokio::test]
async fn missing_page_is_unreachable() {
    let (base, ranges) = mock().await;
    assert!(!probe().is_reachable(&format!("{base}/gone")).await);
    assert!(ranges.lock().is_empty());
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    assert!(!probe().is_reachable(&format!("http://{addr}/x")).await);
}

#[tokio::test]
async fn funnel_drops_records_with_dead_links() {
    let (base, _) = mock().await;
    let store = Arc::new(MemoryStore::new());
    let funnel = Funnel::new(
        store.clone(),
        Arc::new(BroadcastSink::new(8, 60)),
        Scorer::new(Arc::new(Heuristics::default())),
    )
    .with_probe(Some(probe()))
    .allow_local_urls(true);
    let now = Utc::now();

    let dead = format!("{base}/gone");
    let out = funnel.process(candidate(&dead, "Fix bug", "USDC", now), now).await;
    assert!(
        matches!(&out, FunnelOutcome::Rejected(Rejection::Unreachable(u)) if u == &dead),
        "{out:?}"
    );
    assert_eq!(store.len().await, 0);

    let live = format!("{base}/ok");
    let out = funnel.process(candidate(&live, "Fix bug", "USDC", now), now).await;
    assert!(matches!(out, FunnelOutcome::Persisted(_)), "{out:?}");
    assert_eq!(store.len().await, 1);
    assert!(store.get(&live).await.is_some());
}
