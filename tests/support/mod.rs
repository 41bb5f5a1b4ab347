// tests/support/mod.rs
//
// Shared helpers for integration tests: mock upstream servers bound to an
// ephemeral port, fast network settings and record builders.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use chrono::{DateTime, Utc};

use bountyfeed::config::AppConfig;
use bountyfeed::net::{build_client, RateLimiter, RetryPolicy, SourceClient};
use bountyfeed::{CandidateRecord, PaymentKind};

/// Serve `router` on 127.0.0.1:0 and return its base URL.
pub async fn spawn_mock(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock listener");
    let addr = listener.local_addr().expect("mock addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock server");
    });
    format!("http://{addr}")
}

/// Millisecond backoff, no pacing waits.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        base_backoff: Duration::from_millis(1),
        sleep_disabled: false,
    }
}

pub fn fast_client(name: &str) -> SourceClient {
    let http = build_client(Duration::from_secs(5)).expect("http client");
    let limiter = RateLimiter::new(name, Duration::ZERO, 5).with_sleep_disabled(true);
    SourceClient::new(http, Arc::new(limiter), fast_retry())
}

/// Config for pipeline tests: no sleeps, no probing, local URLs allowed.
pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.rate_limit.disable_sleep = true;
    cfg.retry.base_backoff_ms = 1;
    cfg.reachability.enabled = false;
    cfg.allow_local_urls = true;
    cfg.poll_interval_secs = 3600;
    cfg
}

pub fn candidate(url: &str, title: &str, currency: &str, created_at: DateTime<Utc>) -> CandidateRecord {
    CandidateRecord {
        source_id: "test".into(),
        external_id: url.into(),
        title: title.into(),
        description: "desc".into(),
        source_url: url.into(),
        created_at,
        expires_at: None,
        payment_amount: "100".into(),
        payment_currency: currency.into(),
        payment_kind: PaymentKind::Unknown,
        tags: vec!["active".into()],
        origin: "TEST".into(),
    }
}
