// src/notify/discord.rs
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;

use crate::ingest::types::PersistedRecord;
use crate::notify::Notifier;

const GREEN: u32 = 0x10b981;
const YELLOW: u32 = 0xfbbf24;
const RED: u32 = 0xf43f5e;

#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
    backoff_base: Duration,
}

impl DiscordNotifier {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    pub fn with_backoff(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    async fn post(&self, payload: &DiscordWebhookPayload) -> Result<()> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(payload)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status_ref() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!("Discord webhook HTTP error: {e}"),
                },
                Err(e) => anyhow!("Discord webhook request failed: {e}"),
            };
            if attempt >= self.max_retries {
                return Err(err);
            }
            tokio::time::sleep(self.backoff_base * (1u32 << (attempt - 1))).await;
        }
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn alert(&self, r: &PersistedRecord) -> Result<()> {
        self.post(&DiscordWebhookPayload::bounty(r)).await
    }
}

fn color_for(score: i64) -> u32 {
    if score >= 80 {
        RED
    } else if score >= 50 {
        YELLOW
    } else {
        GREEN
    }
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: &'static str,
    value: String,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct EmbedFooter {
    text: &'static str,
}

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
    url: String,
    color: u32,
    fields: Vec<EmbedField>,
    footer: EmbedFooter,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct DiscordWebhookPayload {
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

impl DiscordWebhookPayload {
    fn bounty(r: &PersistedRecord) -> Self {
        let rec = &r.record;
        let field = |name, value: String| EmbedField {
            name,
            value: if value.trim().is_empty() { "-".into() } else { value },
            inline: true,
        };
        Self {
            content: None,
            embeds: vec![DiscordEmbed {
                title: "New bounty detected".into(),
                description: rec.title.clone(),
                url: rec.source_url.clone(),
                color: color_for(r.score),
                fields: vec![
                    field("Platform", rec.origin.clone()),
                    field(
                        "Reward",
                        format!("{} {}", rec.payment_amount, rec.payment_currency)
                            .trim()
                            .to_string(),
                    ),
                    field("Score", r.score.to_string()),
                    field("Payment", rec.payment_kind.as_str().to_string()),
                ],
                footer: EmbedFooter { text: "bountyfeed" },
                timestamp: Utc::now().to_rfc3339(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{CandidateRecord, PaymentKind};

    #[test]
    fn embed_shape_and_color() {
        let r = PersistedRecord {
            record: CandidateRecord {
                source_id: "github".into(),
                external_id: "x".into(),
                title: "Fix bug".into(),
                description: String::new(),
                source_url: "https://github.com/o/r/issues/1".into(),
                created_at: Utc::now(),
                expires_at: None,
                payment_amount: "500".into(),
                payment_currency: "USDC".into(),
                payment_kind: PaymentKind::Crypto,
                tags: vec![],
                origin: "GITHUB/BOUNTY".into(),
            },
            score: 85,
            persisted_at: Utc::now(),
        };
        let v = serde_json::to_value(DiscordWebhookPayload::bounty(&r)).unwrap();
        let e = &v["embeds"][0];
        assert_eq!(e["url"], "https://github.com/o/r/issues/1");
        assert_eq!(e["color"], RED);
        assert_eq!(e["fields"][1]["value"], "500 USDC");
        assert_eq!(e["fields"][3]["value"], "crypto");
        assert_eq!(color_for(55), YELLOW);
        assert_eq!(color_for(10), GREEN);
    }
}
