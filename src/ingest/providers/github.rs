// src/ingest/providers/github.rs
//! GitHub issue search, one query per bounty label.

use std::borrow::Cow;
use std::sync::Arc;

use async_stream::stream;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::GithubConfig;
use crate::error::ScanError;
use crate::heuristics::Heuristics;
use crate::ingest::providers::inference::{derive_tags, infer_payment};
use crate::ingest::providers::{fetch_validated, report_failure};
use crate::ingest::types::{CandidateRecord, SourceAdapter};
use crate::ingest::validate::{Page, PageItem, ValidationMode};
use crate::net::SourceClient;

#[derive(Debug, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub items: Vec<Issue>,
}

#[derive(Debug, Deserialize)]
pub struct Issue {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

#[derive(Debug, Deserialize)]
pub struct Label {
    #[serde(default)]
    pub name: String,
}

impl PageItem for Issue {
    fn title(&self) -> &str {
        &self.title
    }
    fn url(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.html_url.as_str()))
    }
    fn created_at(&self) -> Option<&str> {
        Some(&self.created_at)
    }
    fn body(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }
}

impl Page for SearchPage {
    type Item = Issue;
    fn into_items(self) -> Vec<Issue> {
        self.items
    }
}

pub struct GithubAdapter {
    client: SourceClient,
    base_url: String,
    labels: Vec<String>,
    per_page: u32,
    max_pages: u32,
    mode: ValidationMode,
    heuristics: Arc<Heuristics>,
}

impl GithubAdapter {
    pub fn new(
        client: SourceClient,
        cfg: &GithubConfig,
        mode: ValidationMode,
        heuristics: Arc<Heuristics>,
    ) -> Self {
        Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            labels: cfg.labels.clone(),
            per_page: cfg.per_page.clamp(1, 100),
            max_pages: cfg.max_pages.max(1),
            mode,
            heuristics,
        }
    }

    pub fn page_url(&self, label: &str, page: u32) -> Result<String, ScanError> {
        let mut url = Url::parse(&format!("{}/search/issues", self.base_url))
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        url.query_pairs_mut()
            .append_pair("q", &format!("is:issue is:open label:{label} sort:created-desc"))
            .append_pair("per_page", &self.per_page.to_string())
            .append_pair("page", &page.to_string());
        Ok(url.into())
    }

    fn to_record(&self, issue: Issue, label: &str) -> Option<CandidateRecord> {
        let created_at = DateTime::parse_from_rfc3339(issue.created_at.trim())
            .ok()?
            .with_timezone(&Utc);
        let label_names: Vec<&str> = issue.labels.iter().map(|l| l.name.as_str()).collect();
        let body = issue.body.unwrap_or_default();
        let pay = infer_payment(&label_names, &body);
        let tags = derive_tags(&issue.title, &label_names, &self.heuristics.tags);
        let url = issue.html_url.trim().to_string();

        Some(CandidateRecord {
            source_id: self.name().to_string(),
            external_id: url.clone(),
            title: issue.title,
            description: body,
            source_url: url,
            created_at,
            expires_at: None,
            payment_amount: pay.amount,
            payment_currency: pay.currency,
            payment_kind: pay.kind,
            tags,
            origin: format!("GITHUB/{}", label.to_uppercase()),
        })
    }
}

impl SourceAdapter for GithubAdapter {
    fn name(&self) -> &str {
        "github"
    }

    fn scan<'a>(&'a self, cancel: CancellationToken) -> anyhow::Result<BoxStream<'a, CandidateRecord>> {
        let s = stream! {
            'labels: for label in &self.labels {
                for page in 1..=self.max_pages {
                    if cancel.is_cancelled() {
                        break 'labels;
                    }
                    let url = match self.page_url(label, page) {
                        Ok(url) => url,
                        Err(e) => {
                            report_failure(self.name(), label, page, &e);
                            break 'labels;
                        }
                    };
                    let fetched = match fetch_validated::<SearchPage>(&self.client, &url, &cancel, self.mode).await {
                        Ok(page) => page,
                        Err(ScanError::Cancelled) => break 'labels,
                        Err(e) => {
                            report_failure(self.name(), label, page, &e);
                            break;
                        }
                    };
                    let raw_len = fetched.raw_len;
                    tracing::debug!(
                        target: "ingest",
                        source = "github",
                        label = %label,
                        page,
                        items = fetched.items.len(),
                        raw = raw_len,
                        "page fetched"
                    );
                    for issue in fetched.items {
                        if let Some(rec) = self.to_record(issue, label) {
                            yield rec;
                        }
                    }
                    // Dropped items still count toward a full page.
                    if raw_len < self.per_page as usize {
                        break;
                    }
                }
            }
        };
        Ok(Box::pin(s))
    }
}
