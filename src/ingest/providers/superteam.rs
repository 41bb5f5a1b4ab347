// src/ingest/providers/superteam.rs
//! Superteam Earn listings. The API does not expose a creation time, so
//! records are stamped 48 h in the past.

use std::borrow::Cow;
use std::sync::Arc;

use async_stream::stream;
use chrono::{DateTime, Duration, Utc};
use futures::stream::BoxStream;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::SuperteamConfig;
use crate::error::ScanError;
use crate::heuristics::Heuristics;
use crate::ingest::providers::inference::{derive_tags, format_amount};
use crate::ingest::providers::{fetch_validated, lenient_string, normalize_statuses, report_failure};
use crate::ingest::types::{CandidateRecord, PaymentKind, SourceAdapter};
use crate::ingest::validate::{Page, PageItem, ValidationMode};
use crate::net::SourceClient;

pub const LISTING_URL_PREFIX: &str = "https://earn.superteam.fun/listings/bounty/";
const ASSUMED_AGE_HOURS: i64 = 48;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Listing {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub token: Option<String>,
    pub reward_amount: Option<f64>,
    pub min_reward_ask: Option<f64>,
    pub max_reward_ask: Option<f64>,
    pub compensation_type: Option<String>,
    pub deadline: Option<String>,
    pub status: Option<String>,
}

impl PageItem for Listing {
    const HAS_CREATED_AT: bool = false;

    fn title(&self) -> &str {
        &self.title
    }
    fn url(&self) -> Option<Cow<'_, str>> {
        let slug = self.slug.trim();
        (!slug.is_empty()).then(|| Cow::Owned(format!("{LISTING_URL_PREFIX}{slug}")))
    }
}

/// Top-level JSON array; non-bounty listings are dropped before validation.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct Listings(pub Vec<Listing>);

impl Page for Listings {
    type Item = Listing;
    fn into_items(self) -> Vec<Listing> {
        self.0
            .into_iter()
            .filter(|l| l.kind.trim().eq_ignore_ascii_case("bounty"))
            .collect()
    }
}

fn status_alias(s: &str) -> Option<&'static str> {
    match s {
        "active" | "funded" => Some("open"),
        "in-progress" => Some("review"),
        _ => None,
    }
}

/// `rewardAmount`, else the ask range, else `Variable`.
pub fn reward_of(l: &Listing) -> String {
    if let Some(v) = l.reward_amount {
        return format_amount(v);
    }
    match (l.min_reward_ask, l.max_reward_ask) {
        (Some(lo), Some(hi)) => return format!("{}-{}", format_amount(lo), format_amount(hi)),
        (Some(v), None) | (None, Some(v)) => return format_amount(v),
        (None, None) => {}
    }
    if l
        .compensation_type
        .as_deref()
        .is_some_and(|c| c.eq_ignore_ascii_case("variable"))
    {
        return "Variable".into();
    }
    String::new()
}

pub struct SuperteamAdapter {
    client: SourceClient,
    base_url: String,
    statuses: Vec<String>,
    mode: ValidationMode,
    heuristics: Arc<Heuristics>,
    fallback_samples: bool,
}

impl SuperteamAdapter {
    pub fn new(
        client: SourceClient,
        cfg: &SuperteamConfig,
        mode: ValidationMode,
        heuristics: Arc<Heuristics>,
    ) -> Self {
        Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            statuses: normalize_statuses(&cfg.statuses, status_alias),
            mode,
            heuristics,
            fallback_samples: false,
        }
    }

    pub fn with_fallback_samples(mut self, on: bool) -> Self {
        self.fallback_samples = on;
        self
    }

    fn status_url(&self, status: &str) -> String {
        format!("{}?type=bounties&status={}", self.base_url, status)
    }

    fn to_record(&self, l: Listing, status: &str, now: DateTime<Utc>) -> Option<CandidateRecord> {
        let url = l.url()?.into_owned();
        let reward = reward_of(&l);
        let currency = l.token.as_deref().unwrap_or_default().trim().to_string();
        let kind = if currency.is_empty() {
            PaymentKind::Unknown
        } else {
            PaymentKind::Crypto
        };
        let expires_at = l
            .deadline
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc3339(d.trim()).ok())
            .map(|d| d.with_timezone(&Utc));
        let none: [&str; 0] = [];
        let mut tags = derive_tags(&l.title, &none, &self.heuristics.tags);
        tags.extend(["solana".to_string(), "web3".to_string(), status.to_string()]);
        let external_id = if l.id.is_empty() { l.slug.clone() } else { l.id };

        Some(CandidateRecord {
            source_id: self.name().to_string(),
            external_id,
            description: l.title.clone(),
            title: l.title,
            source_url: url,
            created_at: now - Duration::hours(ASSUMED_AGE_HOURS),
            expires_at,
            payment_amount: reward,
            payment_currency: currency,
            payment_kind: kind,
            tags,
            origin: "SUPERTEAM".into(),
        })
    }
}

/// Illustrative records used only when `emit_fallback_samples` is on.
pub fn fallback_samples(status: &str, now: DateTime<Utc>) -> Vec<CandidateRecord> {
    let sample = |id: &str, title: &str, slug: &str, reward: &str, desc: &str, age_h: i64, extra: &[&str]| {
        let mut tags: Vec<String> = vec!["solana".into()];
        tags.extend(extra.iter().map(|s| s.to_string()));
        tags.push(status.to_string());
        CandidateRecord {
            source_id: "superteam".into(),
            external_id: format!("{id}-{status}"),
            title: title.into(),
            description: desc.into(),
            source_url: format!("{LISTING_URL_PREFIX}{slug}?status={status}"),
            created_at: now - Duration::hours(age_h),
            expires_at: None,
            payment_amount: reward.into(),
            payment_currency: "USDC".into(),
            payment_kind: PaymentKind::Crypto,
            tags,
            origin: "SUPERTEAM".into(),
        }
    };
    vec![
        sample(
            "st-1",
            "ERA Wallet Comparison Bounty",
            "era-wallet-comparison-bounty",
            "500",
            "Compare ERA wallet with other Solana wallets.",
            1,
            &["wallet", "research"],
        ),
        sample(
            "st-2",
            "Marketing Growth Lead",
            "marketing-growth-lead-launchpadtrade",
            "2000",
            "Lead marketing growth for LaunchpadTrade.",
            5,
            &["marketing"],
        ),
    ]
}

impl SourceAdapter for SuperteamAdapter {
    fn name(&self) -> &str {
        "superteam"
    }

    fn scan<'a>(&'a self, cancel: CancellationToken) -> anyhow::Result<BoxStream<'a, CandidateRecord>> {
        let s = stream! {
            for status in &self.statuses {
                if cancel.is_cancelled() {
                    break;
                }
                let url = self.status_url(status);
                let now = Utc::now();
                match fetch_validated::<Listings>(&self.client, &url, &cancel, self.mode).await {
                    Ok(page) => {
                        for l in page.items {
                            if let Some(rec) = self.to_record(l, status, now) {
                                yield rec;
                            }
                        }
                    }
                    Err(ScanError::Cancelled) => break,
                    Err(e) => {
                        report_failure(self.name(), status, 1, &e);
                        if self.fallback_samples {
                            for rec in fallback_samples(status, now) {
                                yield rec;
                            }
                        }
                    }
                }
            }
        };
        Ok(Box::pin(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_precedence() {
        let mut l = Listing {
            reward_amount: Some(1500.0),
            min_reward_ask: Some(1.0),
            ..Default::default()
        };
        assert_eq!(reward_of(&l), "1500");
        l.reward_amount = None;
        l.max_reward_ask = Some(250.5);
        assert_eq!(reward_of(&l), "1-250.5");
        l.min_reward_ask = None;
        l.max_reward_ask = None;
        l.compensation_type = Some("variable".into());
        assert_eq!(reward_of(&l), "Variable");
    }

    #[test]
    fn non_bounties_are_filtered() {
        let raw = r#"[{"type":"project","title":"p","slug":"p"},{"type":"bounty","title":"b","slug":"b"}]"#;
        let page: Listings = serde_json::from_str(raw).unwrap();
        let items = page.into_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "b");
    }

    #[test]
    fn status_aliases() {
        let v = vec!["active".to_string(), "funded".into(), "in-progress".into()];
        assert_eq!(normalize_statuses(&v, status_alias), vec!["open", "review"]);
    }
}
