//! Error taxonomy for the scan pipeline.
//!
//! `ScanError` covers everything that can go wrong while talking to a source;
//! it ends that source's contribution for the cycle but never the cycle itself.
//! `Rejection` is per-record and only ever drops one candidate.

use std::time::Duration;

use thiserror::Error;

/// Failure while fetching or validating one page of a source.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Connect/timeout/transport failure. Retryable.
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// Quota exhausted and still exhausted after all retries.
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Non-retryable HTTP status.
    #[error("unexpected status {status} from {url}: {snippet}")]
    HttpStatus {
        status: u16,
        url: String,
        snippet: String,
    },

    /// Body is not the JSON shape we expect, or an item misses a required field.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// An item carries injection content; the whole page is discarded.
    #[error("unsafe content in item {index}: {reason}")]
    UnsafeContent { index: usize, reason: String },

    /// A request URL could not be built from the configured base.
    #[error("invalid request url: {0}")]
    InvalidUrl(String),

    #[error("scan cancelled")]
    Cancelled,
}

impl ScanError {
    /// Whether the retry executor should try again.
    pub fn is_transient(&self) -> bool {
        matches!(self, ScanError::TransientNetwork(_))
    }
}

impl From<reqwest::Error> for ScanError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.is_request() {
            ScanError::TransientNetwork(e.to_string())
        } else if e.is_decode() || e.is_body() {
            ScanError::MalformedResponse(e.to_string())
        } else {
            ScanError::TransientNetwork(e.to_string())
        }
    }
}

/// Why the funnel dropped a single record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("unreachable url: {0}")]
    Unreachable(String),

    #[error("storage error: {0}")]
    Storage(String),
}
