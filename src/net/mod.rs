// src/net/mod.rs
//! Outbound HTTP plumbing shared by every source adapter: one paced,
//! retrying, cancellable GET.

pub mod rate_limit;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use tokio_util::sync::CancellationToken;

use crate::error::ScanError;

pub use rate_limit::{RateLimitState, RateLimiter};
pub use retry::RetryPolicy;

const USER_AGENT: &str = concat!("bountyfeed/", env!("CARGO_PKG_VERSION"));
const SNIPPET_CHARS: usize = 200;

/// Shared client with sane timeouts.
pub fn build_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5))
        .build()
        .context("building http client")
}

/// Sleep unless the token fires first.
pub async fn sleep_or_cancel(d: Duration, cancel: &CancellationToken) -> Result<(), ScanError> {
    if d.is_zero() {
        return Ok(());
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(ScanError::Cancelled),
        _ = tokio::time::sleep(d) => Ok(()),
    }
}

/// Per-source HTTP handle: pacing, retries, optional `token` auth.
#[derive(Clone)]
pub struct SourceClient {
    http: reqwest::Client,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    token: Option<String>,
}

impl SourceClient {
    pub fn new(http: reqwest::Client, limiter: Arc<RateLimiter>, retry: RetryPolicy) -> Self {
        Self {
            http,
            limiter,
            retry,
            token: None,
        }
    }

    /// Sends `Authorization: token <t>` on every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// GET `url` and return the body of a 2xx response.
    pub async fn get_bytes(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, ScanError> {
        let resp = self
            .retry
            .run(url, cancel, move || async move {
                self.limiter.acquire(cancel).await?;
                let mut req = self.http.get(url).header(ACCEPT, "application/json");
                if let Some(t) = &self.token {
                    req = req.header(AUTHORIZATION, format!("token {t}"));
                }
                let resp = tokio::select! {
                    _ = cancel.cancelled() => return Err(ScanError::Cancelled),
                    r = req.send() => r?,
                };
                self.limiter.record_response_headers(resp.headers()).await;
                Ok(resp)
            })
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ScanError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
                snippet: body.chars().take(SNIPPET_CHARS).collect(),
            });
        }
        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(ScanError::Cancelled),
            b = resp.bytes() => b?,
        };
        Ok(body.to_vec())
    }
}
