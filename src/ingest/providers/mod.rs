// src/ingest/providers/mod.rs
pub mod bountycaster;
pub mod github;
pub mod inference;
pub mod superteam;

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::{Deserialize, Deserializer};
use tokio_util::sync::CancellationToken;

use crate::config::{mask_token, AppConfig, SourceKind};
use crate::error::ScanError;
use crate::heuristics::Heuristics;
use crate::ingest::types::SourceAdapter;
use crate::ingest::validate::{validate, Page, ValidatedPage, ValidationMode};
use crate::net::{build_client, RateLimiter, RetryPolicy, SourceClient};

pub use bountycaster::BountycasterAdapter;
pub use github::GithubAdapter;
pub use superteam::SuperteamAdapter;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetch one page and run it through the validator.
pub(crate) async fn fetch_validated<P: Page>(
    client: &SourceClient,
    url: &str,
    cancel: &CancellationToken,
    mode: ValidationMode,
) -> Result<ValidatedPage<P::Item>, ScanError> {
    let body = client.get_bytes(url, cancel).await?;
    validate::<P>(&body, mode)
}

/// Log and count an error that ends (part of) a source's scan.
pub(crate) fn report_failure(source: &str, scope: &str, page: u32, err: &ScanError) {
    if matches!(
        err,
        ScanError::MalformedResponse(_) | ScanError::UnsafeContent { .. }
    ) {
        counter!("scan_validation_failures_total", "source" => source.to_string()).increment(1);
    }
    counter!("scan_source_errors_total", "source" => source.to_string()).increment(1);
    tracing::warn!(
        target: "ingest",
        source = %source,
        scope = %scope,
        page,
        error = %err,
        "source scan stopped"
    );
}

/// Status aliases → API status; trimmed, lower-cased, deduped, `open` when empty.
pub(crate) fn normalize_statuses(statuses: &[String], alias: fn(&str) -> Option<&'static str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for s in statuses {
        let s = s.trim().to_ascii_lowercase();
        if s.is_empty() {
            continue;
        }
        let n = alias(&s).map(str::to_string).unwrap_or(s);
        if !out.contains(&n) {
            out.push(n);
        }
    }
    if out.is_empty() {
        out.push("open".into());
    }
    out
}

/// Accepts `"12.5"`, `12.5` or `null`.
pub(crate) fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let v = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match v {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

/// Build every enabled adapter from config.
pub fn build_adapters(
    cfg: &AppConfig,
    heuristics: Arc<Heuristics>,
) -> anyhow::Result<Vec<Arc<dyn SourceAdapter>>> {
    let http = build_client(HTTP_TIMEOUT)?;
    let retry = RetryPolicy::from_config(&cfg.retry, cfg.rate_limit.disable_sleep);
    let mut out: Vec<Arc<dyn SourceAdapter>> = Vec::new();

    for kind in cfg.sources() {
        let adapter: Arc<dyn SourceAdapter> = match kind {
            SourceKind::Github => {
                let token = cfg.github.token.clone();
                if let Some(t) = &token {
                    tracing::info!(target: "ingest", token = %mask_token(t), "github token configured");
                }
                let limiter = RateLimiter::from_config("github", &cfg.rate_limit, token.is_some());
                let client = SourceClient::new(http.clone(), Arc::new(limiter), retry).with_token(token);
                Arc::new(GithubAdapter::new(
                    client,
                    &cfg.github,
                    cfg.validation_mode,
                    heuristics.clone(),
                ))
            }
            SourceKind::Superteam => {
                let limiter = RateLimiter::from_config("superteam", &cfg.rate_limit, false);
                let client = SourceClient::new(http.clone(), Arc::new(limiter), retry);
                Arc::new(
                    SuperteamAdapter::new(client, &cfg.superteam, cfg.validation_mode, heuristics.clone())
                        .with_fallback_samples(cfg.emit_fallback_samples),
                )
            }
            SourceKind::Bountycaster => {
                let limiter = RateLimiter::from_config("bountycaster", &cfg.rate_limit, false);
                let client = SourceClient::new(http.clone(), Arc::new(limiter), retry);
                Arc::new(
                    BountycasterAdapter::new(client, &cfg.bountycaster, cfg.validation_mode, heuristics.clone())
                        .with_fallback_samples(cfg.emit_fallback_samples),
                )
            }
        };
        tracing::info!(target: "ingest", source = adapter.name(), "adapter enabled");
        out.push(adapter);
    }
    Ok(out)
}
