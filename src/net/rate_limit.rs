// src/net/rate_limit.rs
//! Per-source request pacing.
//!
//! Quota is unknown until the first response carries `X-RateLimit-*`
//! headers. Once `remaining <= threshold` and the reset lies ahead, callers
//! wait for the reset; otherwise consecutive requests are spaced by
//! `min_interval`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::RateLimitConfig;
use crate::error::ScanError;
use crate::net::sleep_or_cancel;

pub const HDR_REMAINING: &str = "x-ratelimit-remaining";
pub const HDR_RESET: &str = "x-ratelimit-reset";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitState {
    pub remaining_quota: Option<u32>,
    pub quota_reset_at: Option<DateTime<Utc>>,
    pub last_request_at: Option<Instant>,
    pub min_interval: Duration,
}

#[derive(Debug)]
pub struct RateLimiter {
    source: String,
    state: Mutex<RateLimitState>,
    low_quota_threshold: u32,
    sleep_disabled: bool,
}

impl RateLimiter {
    pub fn new(source: impl Into<String>, min_interval: Duration, low_quota_threshold: u32) -> Self {
        Self {
            source: source.into(),
            state: Mutex::new(RateLimitState {
                min_interval,
                ..Default::default()
            }),
            low_quota_threshold,
            sleep_disabled: false,
        }
    }

    /// Spacing depends on whether the source sends credentials.
    pub fn from_config(source: impl Into<String>, cfg: &RateLimitConfig, authenticated: bool) -> Self {
        let ms = if authenticated {
            cfg.authenticated_interval_ms
        } else {
            cfg.unauthenticated_interval_ms
        };
        Self::new(source, Duration::from_millis(ms), cfg.low_quota_threshold)
            .with_sleep_disabled(cfg.disable_sleep)
    }

    pub fn with_sleep_disabled(mut self, disabled: bool) -> Self {
        self.sleep_disabled = disabled;
        self
    }

    /// Block until it is safe to send the next request.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), ScanError> {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }
        let mut st = self.state.lock().await;

        let wait = self.wait_for(&st, Utc::now(), Instant::now());
        if !wait.is_zero() && !self.sleep_disabled {
            tracing::debug!(
                target: "net",
                source = %self.source,
                wait_ms = wait.as_millis() as u64,
                remaining = ?st.remaining_quota,
                "rate limit wait"
            );
            sleep_or_cancel(wait, cancel).await?;
        }

        if st.remaining_quota.is_some_and(|r| r <= self.low_quota_threshold)
            && st.quota_reset_at.is_some_and(|t| t <= Utc::now() || self.sleep_disabled)
        {
            // The window rolled over; quota is unknown again until the next response.
            st.remaining_quota = None;
            st.quota_reset_at = None;
        }
        st.last_request_at = Some(Instant::now());
        Ok(())
    }

    /// How long a request issued now would have to wait.
    fn wait_for(&self, st: &RateLimitState, wall_now: DateTime<Utc>, now: Instant) -> Duration {
        if let (Some(rem), Some(reset)) = (st.remaining_quota, st.quota_reset_at) {
            if rem <= self.low_quota_threshold && reset > wall_now {
                return (reset - wall_now).to_std().unwrap_or_default();
            }
        }
        match st.last_request_at {
            Some(last) => st.min_interval.saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Update quota from server counters. Absent or garbled headers leave the state alone.
    pub async fn record_response_headers(&self, headers: &HeaderMap) {
        let remaining = header_num::<u32>(headers, HDR_REMAINING);
        let reset = header_num::<i64>(headers, HDR_RESET)
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
        if remaining.is_none() && reset.is_none() {
            return;
        }
        let mut st = self.state.lock().await;
        if remaining.is_some() {
            st.remaining_quota = remaining;
        }
        if reset.is_some() {
            st.quota_reset_at = reset;
        }
    }

    pub async fn snapshot(&self) -> RateLimitState {
        self.state.lock().await.clone()
    }
}

fn header_num<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<T>().ok())
}
