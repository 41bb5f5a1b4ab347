//! # Heuristics
//!
//! Keyword lists and payment tiers shared by the scoring engine and the source
//! adapters. Built once at startup from config (`[heuristics]` in the TOML file)
//! and handed out behind an `Arc`; nothing mutates it afterwards.
//!
//! - Every list is trimmed, upper-cased and de-duplicated.
//! - An empty/missing list falls back to the built-in default; a non-empty one
//!   replaces it entirely.
//! - Dev keywords never contain automation keywords and security keywords never
//!   contain audit keywords, so a customized list cannot double count a title.

use serde::Deserialize;
use std::collections::HashSet;

/// Raw, user-supplied lists. Everything is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HeuristicOverrides {
    pub urgency_keywords: Vec<String>,
    pub dev_task_keywords: Vec<String>,
    pub automation_keywords: Vec<String>,
    pub security_keywords: Vec<String>,
    pub audit_keywords: Vec<String>,
    pub crypto_currencies: Vec<String>,
    pub p2p_methods: Vec<String>,
    pub fiat_methods: Vec<String>,
    /// Ordered payment preferences; split into tiers when no tier list is given.
    pub payment_preferences: Vec<String>,
    pub platform_bonuses: Vec<PlatformBonus>,
}

/// Fixed bonus when the origin contains any of `patterns`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlatformBonus {
    pub patterns: Vec<String>,
    pub points: i32,
}

/// Title → tag rules used by the adapters (lower-case substrings).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRules {
    pub urgent: Vec<String>,
    pub dev: Vec<String>,
    pub automation: Vec<String>,
}

impl Default for TagRules {
    fn default() -> Self {
        Self {
            urgent: vec!["urgent".into()],
            dev: vec!["fix".into(), "bug".into()],
            automation: vec!["script".into(), "bot".into()],
        }
    }
}

/// Normalized, immutable heuristic configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heuristics {
    pub urgency_keywords: Vec<String>,
    pub dev_task_keywords: Vec<String>,
    pub automation_keywords: Vec<String>,
    pub security_keywords: Vec<String>,
    pub audit_keywords: Vec<String>,
    pub crypto_currencies: Vec<String>,
    pub p2p_methods: Vec<String>,
    pub fiat_methods: Vec<String>,
    pub platform_bonuses: Vec<PlatformBonus>,
    pub tags: TagRules,
}

const KNOWN_CRYPTO: &[&str] = &[
    "USDC", "USDT", "SOL", "ETH", "BTC", "MATIC", "AVAX", "ARB", "OP",
];
const KNOWN_P2P: &[&str] = &["CASHAPP", "VENMO", "CASH APP"];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Heuristics {
    fn default() -> Self {
        Self::from_overrides(&HeuristicOverrides::default())
    }
}

impl Heuristics {
    /// Built-in lists, before any override.
    fn seed() -> HeuristicOverrides {
        HeuristicOverrides {
            urgency_keywords: strings(&["URGENT", "ASAP", "CRITICAL", "IMMEDIATE", "EMERGENCY"]),
            dev_task_keywords: strings(&[
                "FIX",
                "BUG",
                "API",
                "INTEGRATION",
                "SMART CONTRACT",
                "BLOCKCHAIN",
            ]),
            automation_keywords: strings(&["SCRIPT", "BOT"]),
            security_keywords: strings(&[
                "SECURITY",
                "VULNERABILITY",
                "PENTEST",
                "HACK",
                "EXPLOIT",
            ]),
            audit_keywords: strings(&["AUDIT"]),
            crypto_currencies: strings(KNOWN_CRYPTO),
            p2p_methods: strings(KNOWN_P2P),
            fiat_methods: strings(&["USD", "PAYPAL", "STRIPE", "WISE"]),
            payment_preferences: Vec::new(),
            platform_bonuses: vec![
                PlatformBonus {
                    patterns: strings(&["SUPERTEAM"]),
                    points: 15,
                },
                PlatformBonus {
                    patterns: strings(&["BOUNTYCASTER"]),
                    points: 10,
                },
                PlatformBonus {
                    patterns: strings(&["IMMUNEFI", "HACKEN"]),
                    points: 30,
                },
            ],
        }
    }

    /// Merge overrides over the defaults and normalize.
    pub fn from_overrides(o: &HeuristicOverrides) -> Self {
        let d = Self::seed();

        let urgency_keywords = upper_list(coalesce(&o.urgency_keywords, &d.urgency_keywords));
        let automation_keywords =
            upper_list(coalesce(&o.automation_keywords, &d.automation_keywords));
        let audit_keywords = upper_list(coalesce(&o.audit_keywords, &d.audit_keywords));
        let dev_task_keywords = remove_overlap(
            upper_list(coalesce(&o.dev_task_keywords, &d.dev_task_keywords)),
            &automation_keywords,
        );
        let security_keywords = remove_overlap(
            upper_list(coalesce(&o.security_keywords, &d.security_keywords)),
            &audit_keywords,
        );

        let no_tiers = o.crypto_currencies.is_empty()
            && o.p2p_methods.is_empty()
            && o.fiat_methods.is_empty();
        let (crypto_currencies, p2p_methods, fiat_methods) =
            if no_tiers && !o.payment_preferences.is_empty() {
                derive_tiers(&o.payment_preferences, &d)
            } else {
                (
                    upper_list(coalesce(&o.crypto_currencies, &d.crypto_currencies)),
                    upper_list(coalesce(&o.p2p_methods, &d.p2p_methods)),
                    upper_list(coalesce(&o.fiat_methods, &d.fiat_methods)),
                )
            };

        let platform_bonuses = if o.platform_bonuses.is_empty() {
            d.platform_bonuses
        } else {
            o.platform_bonuses
                .iter()
                .map(|b| PlatformBonus {
                    patterns: upper_list(&b.patterns),
                    points: b.points,
                })
                .filter(|b| !b.patterns.is_empty())
                .collect()
        };

        let tags = TagRules {
            urgent: TagRules::default().urgent,
            dev: TagRules::default().dev,
            automation: automation_keywords
                .iter()
                .map(|k| k.to_ascii_lowercase())
                .collect(),
        };

        Self {
            urgency_keywords,
            dev_task_keywords,
            automation_keywords,
            security_keywords,
            audit_keywords,
            crypto_currencies,
            p2p_methods,
            fiat_methods,
            platform_bonuses,
            tags,
        }
    }
}

/// Split ordered preferences into (crypto, p2p, fiat). A tier nobody mentions
/// keeps its default list.
fn derive_tiers(
    prefs: &[String],
    d: &HeuristicOverrides,
) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut crypto = Vec::new();
    let mut p2p = Vec::new();
    let mut fiat = Vec::new();
    for p in upper_list(prefs) {
        if KNOWN_CRYPTO.contains(&p.as_str()) {
            crypto.push(p);
        } else if KNOWN_P2P.contains(&p.as_str()) {
            p2p.push(p);
        } else {
            fiat.push(p);
        }
    }
    let pick = |v: Vec<String>, fallback: &[String]| {
        if v.is_empty() {
            upper_list(fallback)
        } else {
            v
        }
    };
    (
        pick(crypto, &d.crypto_currencies),
        pick(p2p, &d.p2p_methods),
        pick(fiat, &d.fiat_methods),
    )
}

fn coalesce<'a>(list: &'a [String], fallback: &'a [String]) -> &'a [String] {
    if list.iter().all(|s| s.trim().is_empty()) {
        fallback
    } else {
        list
    }
}

/// Trim, upper-case, drop empties and duplicates (first occurrence wins).
pub fn upper_list(list: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(list.len());
    for item in list {
        let t = item.trim().to_ascii_uppercase();
        if t.is_empty() || !seen.insert(t.clone()) {
            continue;
        }
        out.push(t);
    }
    out
}

fn remove_overlap(base: Vec<String>, deny: &[String]) -> Vec<String> {
    base.into_iter().filter(|k| !deny.contains(k)).collect()
}
