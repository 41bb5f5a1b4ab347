// src/ingest/providers/bountycaster.rs
//! Bountycaster (Farcaster bounties), one request per status.

use std::borrow::Cow;
use std::sync::Arc;

use async_stream::stream;
use chrono::{DateTime, Duration, Utc};
use futures::stream::BoxStream;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::BountycasterConfig;
use crate::error::ScanError;
use crate::heuristics::Heuristics;
use crate::ingest::providers::inference::derive_tags;
use crate::ingest::providers::{fetch_validated, lenient_string, normalize_statuses, report_failure};
use crate::ingest::types::{CandidateRecord, PaymentKind, SourceAdapter};
use crate::ingest::validate::{Page, PageItem, ValidationMode};
use crate::net::SourceClient;

pub const SITE: &str = "https://www.bountycaster.xyz";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BountyPage {
    pub bounties: Vec<Bounty>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Bounty {
    #[serde(deserialize_with = "lenient_string")]
    pub uid: String,
    pub title: String,
    pub summary_text: String,
    pub created_at: String,
    pub expiration_date: Option<String>,
    pub tag_slugs: Vec<String>,
    pub links: Links,
    pub reward_summary: Option<RewardSummary>,
    pub platform: Platform,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Links {
    pub external: Option<String>,
    pub resource: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Platform {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub hash: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RewardSummary {
    #[serde(deserialize_with = "lenient_string")]
    pub unit_amount: String,
    #[serde(deserialize_with = "lenient_string")]
    pub usd_value: String,
    pub symbol: Option<String>,
    pub token: Option<Token>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Token {
    pub symbol: Option<String>,
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Bounty {
    /// Site-relative resource link, else the external link, else the cast hash.
    pub fn link(&self) -> Option<String> {
        if let Some(r) = non_empty(&self.links.resource) {
            return Some(format!("{SITE}{r}"));
        }
        if let Some(e) = non_empty(&self.links.external) {
            return Some(e.to_string());
        }
        non_empty(&self.platform.hash).map(|h| format!("{SITE}/bounty/{h}"))
    }

    /// `(amount, currency)` from the reward summary.
    pub fn reward(&self) -> (String, String) {
        let Some(r) = &self.reward_summary else {
            return (String::new(), String::new());
        };
        let amount = if r.unit_amount.trim().is_empty() {
            r.usd_value.trim().to_string()
        } else {
            r.unit_amount.trim().to_string()
        };
        let currency = non_empty(&r.symbol)
            .or_else(|| r.token.as_ref().and_then(|t| non_empty(&t.symbol)))
            .unwrap_or_default()
            .to_string();
        (amount, currency)
    }
}

impl PageItem for Bounty {
    fn title(&self) -> &str {
        &self.title
    }
    fn url(&self) -> Option<Cow<'_, str>> {
        self.link().map(Cow::Owned)
    }
    fn created_at(&self) -> Option<&str> {
        Some(&self.created_at)
    }
    fn body(&self) -> &str {
        &self.summary_text
    }
}

impl Page for BountyPage {
    type Item = Bounty;
    fn into_items(self) -> Vec<Bounty> {
        self.bounties
    }
}

fn status_alias(s: &str) -> Option<&'static str> {
    match s {
        "active" | "funded" => Some("open"),
        "inprogress" => Some("in-progress"),
        _ => None,
    }
}

pub struct BountycasterAdapter {
    client: SourceClient,
    base_url: String,
    statuses: Vec<String>,
    mode: ValidationMode,
    heuristics: Arc<Heuristics>,
    fallback_samples: bool,
}

impl BountycasterAdapter {
    pub fn new(
        client: SourceClient,
        cfg: &BountycasterConfig,
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

    fn to_record(&self, b: Bounty, status: &str) -> Option<CandidateRecord> {
        let url = b.link()?;
        let created_at = DateTime::parse_from_rfc3339(b.created_at.trim())
            .ok()?
            .with_timezone(&Utc);
        let expires_at = b
            .expiration_date
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc3339(d.trim()).ok())
            .map(|d| d.with_timezone(&Utc));
        let (amount, currency) = b.reward();
        let kind = if currency.is_empty() {
            PaymentKind::Unknown
        } else {
            PaymentKind::Crypto
        };

        let none: [&str; 0] = [];
        let mut tags = derive_tags(&b.title, &none, &self.heuristics.tags);
        tags.extend(["farcaster".to_string(), "social".to_string(), status.to_string()]);
        tags.extend(
            b.tag_slugs
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        );

        Some(CandidateRecord {
            source_id: self.name().to_string(),
            external_id: if b.uid.is_empty() { url.clone() } else { b.uid },
            title: b.title,
            description: b.summary_text,
            source_url: url,
            created_at,
            expires_at,
            payment_amount: amount,
            payment_currency: currency,
            payment_kind: kind,
            tags,
            origin: "BOUNTYCASTER".into(),
        })
    }
}

/// Illustrative records used only when `emit_fallback_samples` is on.
pub fn fallback_samples(status: &str, now: DateTime<Utc>) -> Vec<CandidateRecord> {
    let rows: [(&str, &str, &str, &str, &str, i64, [&str; 3]); 2] = [
        (
            "bc-1",
            "Dune Dashboard for Seamless Protocol",
            "0x11ce0fa8",
            "15000",
            "Create a Dune dashboard for Seamless Protocol metrics.",
            30,
            ["farcaster", "dune", "data"],
        ),
        (
            "bc-2",
            "Restaurant recommendations in NYC",
            "0x22df1gb9",
            "50",
            "Looking for the best pizza spots in Brooklyn.",
            120,
            ["farcaster", "nyc", "pizza"],
        ),
    ];
    rows.into_iter()
        .map(|(id, title, hash, reward, desc, age_min, tags)| {
            let mut tags: Vec<String> = tags.iter().map(|s| s.to_string()).collect();
            tags.push(status.to_string());
            CandidateRecord {
                source_id: "bountycaster".into(),
                external_id: format!("{id}-{status}"),
                title: title.into(),
                description: desc.into(),
                source_url: format!("{SITE}/bounty/{hash}?status={status}"),
                created_at: now - Duration::minutes(age_min),
                expires_at: None,
                payment_amount: reward.into(),
                payment_currency: "USDC".into(),
                payment_kind: PaymentKind::Crypto,
                tags,
                origin: "BOUNTYCASTER".into(),
            }
        })
        .collect()
}

impl SourceAdapter for BountycasterAdapter {
    fn name(&self) -> &str {
        "bountycaster"
    }

    fn scan<'a>(&'a self, cancel: CancellationToken) -> anyhow::Result<BoxStream<'a, CandidateRecord>> {
        let s = stream! {
            for status in &self.statuses {
                if cancel.is_cancelled() {
                    break;
                }
                let url = format!("{}/{}", self.base_url, status);
                match fetch_validated::<BountyPage>(&self.client, &url, &cancel, self.mode).await {
                    Ok(page) => {
                        for b in page.items {
                            if let Some(rec) = self.to_record(b, status) {
                                yield rec;
                            }
                        }
                    }
                    Err(ScanError::Cancelled) => break,
                    Err(e) => {
                        report_failure(self.name(), status, 1, &e);
                        if self.fallback_samples {
                            for rec in fallback_samples(status, Utc::now()) {
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

    fn bounty(json: &str) -> Bounty {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn link_precedence() {
        let b = bounty(r#"{"links":{"resource":"/bounty/abc","external":"https://x.io"},"platform":{"hash":"0x1"}}"#);
        assert_eq!(b.link().as_deref(), Some("https://www.bountycaster.xyz/bounty/abc"));
        let b = bounty(r#"{"links":{"external":"https://x.io/e"},"platform":{"hash":"0x1"}}"#);
        assert_eq!(b.link().as_deref(), Some("https://x.io/e"));
        let b = bounty(r#"{"platform":{"hash":"0x1"}}"#);
        assert_eq!(b.link().as_deref(), Some("https://www.bountycaster.xyz/bounty/0x1"));
        assert_eq!(bounty("{}").link(), None);
    }

    #[test]
    fn reward_symbol_fallbacks() {
        let b = bounty(r#"{"reward_summary":{"unit_amount":"","usd_value":25,"token":{"symbol":"DEGEN"}}}"#);
        assert_eq!(b.reward(), ("25".to_string(), "DEGEN".to_string()));
        let b = bounty(r#"{"reward_summary":{"unit_amount":"100","symbol":"USDC"}}"#);
        assert_eq!(b.reward(), ("100".to_string(), "USDC".to_string()));
        assert_eq!(bounty("{}").reward(), (String::new(), String::new()));
    }

    #[test]
    fn status_aliases() {
        let v = vec!["funded".to_string(), "inprogress".into(), "open".into()];
        assert_eq!(normalize_statuses(&v, status_alias), vec!["open", "in-progress"]);
    }
}
