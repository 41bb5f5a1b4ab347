// src/ingest/mod.rs
pub mod funnel;
pub mod providers;
pub mod scheduler;
pub mod types;
pub mod url_guard;
pub mod validate;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use sha2::{Digest, Sha256};

/// Default bound for free-text fields.
pub const MAX_TEXT_CHARS: usize = 1000;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "scan_records_total",
            "Candidate records forwarded by source adapters."
        );
        describe_counter!(
            "scan_source_errors_total",
            "Adapter requests that ended a source's contribution for the cycle."
        );
        describe_counter!(
            "scan_validation_failures_total",
            "Response pages rejected by the validator."
        );
        describe_counter!("funnel_rejected_total", "Records dropped by the funnel.");
        describe_counter!(
            "funnel_duplicates_total",
            "Records skipped because their URL is already stored."
        );
        describe_counter!("funnel_persisted_total", "Records scored and stored.");
        describe_counter!("notify_sent_total", "Alerts delivered to a channel.");
        describe_counter!("net_retries_total", "Outbound request retries.");
        describe_histogram!("scan_cycle_ms", "Scan cycle wall time in milliseconds.");
        describe_gauge!("scan_last_cycle_ts", "Unix ts when the last scan cycle ended.");
    });
}

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Canonical form of a record URL, the dedup key.
///
/// Control characters are removed, only the first whitespace-delimited token is
/// kept and trailing sentence punctuation is stripped. Returns `""` when
/// nothing is left.
pub fn canonicalize_url(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| !c.is_control()).collect();
    let first = cleaned.split_whitespace().next().unwrap_or_default();
    first
        .trim_end_matches(['.', ',', ';', '!', '?', ')', '"', '\''])
        .to_string()
}

/// Single-line, control-free text bounded to `max_chars` (with `...`).
pub fn sanitize_text(s: &str, max_chars: usize) -> String {
    let no_ctrl: String = s
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let out = RE_WS.replace_all(&no_ctrl, " ").trim().to_string();
    if out.chars().count() > max_chars {
        let mut cut: String = out.chars().take(max_chars).collect();
        cut.push_str("...");
        return cut;
    }
    out
}

/// Short stable fingerprint for log lines.
pub fn record_fingerprint(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    digest.iter().take(6).map(|b| format!("{b:02x}")).collect()
}
