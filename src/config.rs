// src/config.rs
//! Service configuration.
//!
//! Lookup order:
//! 1) `$BOUNTYFEED_CONFIG_PATH` (must exist when set)
//! 2) `config/bountyfeed.toml` (optional; defaults when missing)
//!
//! Then environment overrides (`.env` is loaded by the binary via `dotenvy`),
//! then normalization.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::heuristics::{HeuristicOverrides, Heuristics};
use crate::ingest::validate::ValidationMode;

pub const ENV_CONFIG_PATH: &str = "BOUNTYFEED_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/bountyfeed.toml";

const DEFAULT_LABELS: &[&str] = &[
    "algora-bounty",
    "polar",
    "opire",
    "gitpay",
    "issuehunt",
    "bounty",
    "funded",
];

/// The three source adapters the service knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKind {
    Github,
    Superteam,
    Bountycaster,
}

impl SourceKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GITHUB" | "GITHUB_AGGREGATOR" => Some(Self::Github),
            "SUPERTEAM" => Some(Self::Superteam),
            "BOUNTYCASTER" => Some(Self::Bountycaster),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub token: Option<String>,
    pub base_url: String,
    pub labels: Vec<String>,
    pub per_page: u32,
    pub max_pages: u32,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: "https://api.github.com".into(),
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
            per_page: 100,
            max_pages: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SuperteamConfig {
    pub base_url: String,
    pub statuses: Vec<String>,
}

impl Default for SuperteamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://earn.superteam.fun/api/listings".into(),
            statuses: vec!["open".into()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BountycasterConfig {
    pub base_url: String,
    pub statuses: Vec<String>,
}

impl Default for BountycasterConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.bountycaster.xyz/api/v1/bounties".into(),
            statuses: vec!["open".into()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Skip every wall-clock wait (tests, offline replays).
    pub disable_sleep: bool,
    pub authenticated_interval_ms: u64,
    pub unauthenticated_interval_ms: u64,
    pub low_quota_threshold: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            disable_sleep: false,
            authenticated_interval_ms: 2_000,
            unauthenticated_interval_ms: 10_000,
            low_quota_threshold: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReachabilityConfig {
    pub enabled: bool,
    pub timeout_secs: u64,
}

impl Default for ReachabilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 5,
        }
    }
}

impl ReachabilityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub enabled_sources: Vec<String>,
    pub poll_interval_secs: u64,
    pub queue_capacity: usize,
    pub min_score: i64,
    pub storage_path: PathBuf,
    pub discord_webhook_url: Option<String>,
    pub allow_local_urls: bool,
    pub validation_mode: ValidationMode,
    pub emit_fallback_samples: bool,
    pub github: GithubConfig,
    pub superteam: SuperteamConfig,
    pub bountycaster: BountycasterConfig,
    pub rate_limit: RateLimitConfig,
    pub retry: RetryConfig,
    pub reachability: ReachabilityConfig,
    pub heuristics: HeuristicOverrides,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            enabled_sources: vec!["GITHUB".into(), "SUPERTEAM".into(), "BOUNTYCASTER".into()],
            poll_interval_secs: 60,
            queue_capacity: 100,
            min_score: 60,
            storage_path: PathBuf::from("data/bounties.json"),
            discord_webhook_url: None,
            allow_local_urls: false,
            validation_mode: ValidationMode::default(),
            emit_fallback_samples: false,
            github: GithubConfig::default(),
            superteam: SuperteamConfig::default(),
            bountycaster: BountycasterConfig::default(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            reachability: ReachabilityConfig::default(),
            heuristics: HeuristicOverrides::default(),
        }
    }
}

impl AppConfig {
    /// Load from an explicit TOML file, apply process env, normalize.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg = Self::from_toml_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg.normalize();
        cfg.check()?;
        Ok(cfg)
    }

    /// Load using `$BOUNTYFEED_CONFIG_PATH`, then `config/bountyfeed.toml`,
    /// else built-in defaults.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        let p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if p.exists() {
            return Self::load_from(&p);
        }
        let mut cfg = Self::default();
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg.normalize();
        cfg.check()?;
        Ok(cfg)
    }

    /// Parse without touching the environment.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(s)?;
        Ok(cfg)
    }

    /// Apply overrides from a key lookup (`std::env::var` in production).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("GITHUB_TOKEN") {
            self.github.token = Some(v);
        }
        if let Some(v) = get("DISCORD_WEBHOOK_URL") {
            self.discord_webhook_url = Some(v);
        }
        if let Some(v) = get("POLL_INTERVAL_SECONDS").and_then(|v| positive(&v)) {
            self.poll_interval_secs = v;
        }
        if let Some(v) = get("MIN_SCORE").and_then(|v| v.parse::<i64>().ok()) {
            if v >= 0 {
                self.min_score = v;
            }
        }
        if let Some(v) = get("STORAGE_PATH") {
            self.storage_path = PathBuf::from(v);
        }
        if let Some(v) = get("ENABLED_SCANNERS") {
            self.enabled_sources = split_list(&v);
        }
        if let Some(v) = get("GITHUB_LABELS") {
            self.github.labels = split_list(&v);
        }
        if let Some(v) = get("GITHUB_PER_PAGE").and_then(|v| positive(&v)) {
            self.github.per_page = v.min(u32::MAX as u64) as u32;
        }
        if let Some(v) = get("GITHUB_MAX_PAGES").and_then(|v| positive(&v)) {
            self.github.max_pages = v.min(u32::MAX as u64) as u32;
        }
        if let Some(v) = get("GITHUB_BASE_URL") {
            self.github.base_url = v;
        }
        if let Some(v) = get("VALIDATE_LINKS_HTTP").and_then(|v| parse_bool(&v)) {
            self.reachability.enabled = v;
        }
        if let Some(v) = get("LINK_VALIDATION_TIMEOUT_SECONDS").and_then(|v| positive(&v)) {
            self.reachability.timeout_secs = v;
        }
        if let Some(v) = get("BOUNTYFEED_DISABLE_RATE_LIMIT_SLEEP").and_then(|v| parse_bool(&v)) {
            self.rate_limit.disable_sleep = v;
        }
        if let Some(v) = get("BOUNTYFEED_ALLOW_LOCAL_URLS").and_then(|v| parse_bool(&v)) {
            self.allow_local_urls = v;
        }
    }

    /// Clamp numbers, clean lists, drop blank secrets.
    pub fn normalize(&mut self) {
        let d = AppConfig::default();

        if self.poll_interval_secs == 0 {
            self.poll_interval_secs = d.poll_interval_secs;
        }
        if self.queue_capacity == 0 {
            self.queue_capacity = d.queue_capacity;
        }
        if self.min_score < 0 {
            self.min_score = d.min_score;
        }
        if self.reachability.timeout_secs == 0 {
            self.reachability.timeout_secs = d.reachability.timeout_secs;
        }
        if !(1..=100).contains(&self.github.per_page) {
            self.github.per_page = d.github.per_page;
        }
        if !(1..=100).contains(&self.github.max_pages) {
            self.github.max_pages = d.github.max_pages;
        }

        self.enabled_sources = clean_list(std::mem::take(&mut self.enabled_sources));
        self.github.labels = clean_list(std::mem::take(&mut self.github.labels));
        if self.github.labels.is_empty() {
            self.github.labels = d.github.labels;
        }
        self.superteam.statuses = clean_list(std::mem::take(&mut self.superteam.statuses));
        self.bountycaster.statuses = clean_list(std::mem::take(&mut self.bountycaster.statuses));

        self.github.token = blank_to_none(self.github.token.take());
        self.discord_webhook_url = blank_to_none(self.discord_webhook_url.take());
        self.github.base_url = self.github.base_url.trim_end_matches('/').to_string();
        self.superteam.base_url = self.superteam.base_url.trim_end_matches('/').to_string();
        self.bountycaster.base_url = self.bountycaster.base_url.trim_end_matches('/').to_string();
    }

    /// Enabled adapters in configured order. Unknown names are logged and skipped.
    pub fn sources(&self) -> Vec<SourceKind> {
        let mut out = Vec::new();
        for name in &self.enabled_sources {
            match SourceKind::parse(name) {
                Some(k) if !out.contains(&k) => out.push(k),
                Some(_) => {}
                None => tracing::warn!(source = %name, "unknown source name ignored"),
            }
        }
        out
    }

    /// Startup sanity check; the only config failure that stops the service.
    pub fn check(&self) -> Result<()> {
        if self.sources().is_empty() {
            bail!("no enabled sources (enabled_sources = {:?})", self.enabled_sources);
        }
        Ok(())
    }

    pub fn heuristics(&self) -> Heuristics {
        Heuristics::from_overrides(&self.heuristics)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// `ghp_secret1234` → `gh****34`. Short secrets are fully masked.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 4 {
        return "****".into();
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}****{tail}")
}

fn positive(v: &str) -> Option<u64> {
    v.parse::<i64>().ok().filter(|n| *n > 0).map(|n| n as u64)
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_list(v: &str) -> Vec<String> {
    v.split(',').map(|s| s.to_string()).collect()
}

/// Trim, drop empties, dedup keeping first-seen order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() && seen.insert(t.to_string()) {
            out.push(t.to_string());
        }
    }
    out
}

fn blank_to_none(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
