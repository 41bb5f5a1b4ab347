// src/net/retry.rs
use std::future::Future;
use std::time::Duration;

use metrics::counter;
use reqwest::{Response, StatusCode};
use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::error::ScanError;
use crate::net::sleep_or_cancel;

/// Retries 5xx/429 responses and transient transport errors with
/// exponential backoff (`base * 2^(retry-1)`).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub sleep_disabled: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_secs(1),
            sleep_disabled: false,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &RetryConfig, sleep_disabled: bool) -> Self {
        Self {
            max_retries: cfg.max_retries,
            base_backoff: Duration::from_millis(cfg.base_backoff_ms),
            sleep_disabled,
        }
    }

    /// Backoff before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(16);
        self.base_backoff.saturating_mul(1u32 << shift)
    }

    /// Run `attempt` until it yields a non-retryable outcome or retries run out.
    /// Non-retryable statuses are handed back as `Ok` for the caller to judge.
    pub async fn run<F, Fut>(
        &self,
        url: &str,
        cancel: &CancellationToken,
        mut attempt: F,
    ) -> Result<Response, ScanError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Response, ScanError>>,
    {
        let mut retry = 0u32;
        loop {
            let outcome = attempt().await;
            let reason = match &outcome {
                Ok(resp) if is_retryable(resp.status()) => Some(resp.status().to_string()),
                Err(e) if e.is_transient() => Some(e.to_string()),
                _ => None,
            };
            let Some(reason) = reason else {
                return outcome;
            };

            if retry >= self.max_retries {
                return match outcome {
                    Ok(resp) => Err(exhausted(url, resp).await),
                    Err(e) => Err(e),
                };
            }

            retry += 1;
            let backoff = self.backoff(retry);
            counter!("net_retries_total").increment(1);
            tracing::info!(
                target: "net",
                url = %url,
                attempt = retry,
                max = self.max_retries,
                backoff_ms = backoff.as_millis() as u64,
                reason = %reason,
                "retrying request"
            );
            if !self.sleep_disabled {
                sleep_or_cancel(backoff, cancel).await?;
            } else if cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

async fn exhausted(url: &str, resp: Response) -> ScanError {
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return ScanError::RateLimited { retry_after };
    }
    let snippet: String = resp
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(200)
        .collect();
    ScanError::HttpStatus {
        status: status.as_u16(),
        url: url.to_string(),
        snippet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let p = RetryPolicy {
            base_backoff: Duration::from_millis(100),
            ..Default::default()
        };
        assert_eq!(p.backoff(1), Duration::from_millis(100));
        assert_eq!(p.backoff(2), Duration::from_millis(200));
        assert_eq!(p.backoff(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn non_transient_error_is_not_retried() {
        let p = RetryPolicy {
            base_backoff: Duration::from_millis(1),
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let mut calls = 0;
        let err = p
            .run("http://x", &cancel, || {
                calls += 1;
                async { Err(ScanError::MalformedResponse("nope".into())) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::MalformedResponse(_)));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn transient_error_retried_then_surfaced() {
        let p = RetryPolicy {
            base_backoff: Duration::from_millis(1),
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let mut calls = 0;
        let err = p
            .run("http://x", &cancel, || {
                calls += 1;
                async { Err(ScanError::TransientNetwork("reset".into())) }
            })
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(calls, 4);
    }
}
