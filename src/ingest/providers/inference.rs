// src/ingest/providers/inference.rs
//! Payment and tag inference shared by the adapters.
//!
//! Order matters: structured labels first, then free-text body, then the
//! neutral fiat/USD default.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::heuristics::TagRules;
use crate::ingest::types::PaymentKind;

/// Crypto tokens on letter boundaries: `100USDC` matches, `solution` does not.
static RE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z])(usdc|usdt|eth|sol)(?:[^a-z]|$)").expect("static regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentGuess {
    pub amount: String,
    pub currency: String,
    pub kind: PaymentKind,
    pub funded: bool,
}

/// First crypto token in `s`, upper-cased.
pub fn crypto_token(s: &str) -> Option<String> {
    RE_TOKEN
        .captures(s)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_uppercase())
}

pub fn infer_payment<S: AsRef<str>>(labels: &[S], body: &str) -> PaymentGuess {
    let mut g = PaymentGuess {
        amount: "Funded".into(),
        currency: "USD".into(),
        kind: PaymentKind::Fiat,
        funded: false,
    };

    for label in labels {
        let label = label.as_ref();
        let lower = label.to_ascii_lowercase();
        if lower.contains("funded") {
            g.funded = true;
        }
        if lower.contains('$') {
            g.amount = label.trim().to_string();
            g.currency = "USD".into();
        }
        if let Some(tok) = crypto_token(label) {
            g.amount = label.trim().to_string();
            g.currency = tok;
            g.kind = PaymentKind::Crypto;
        }
    }

    if g.kind != PaymentKind::Crypto {
        let lower = body.to_ascii_lowercase();
        if let Some(tok) = crypto_token(&lower) {
            g.currency = tok;
            g.kind = PaymentKind::Crypto;
        } else if lower.contains("paypal") {
            g.currency = "PAYPAL".into();
            g.kind = PaymentKind::Fiat;
        } else if lower.contains("cash app") || lower.contains("cashapp") {
            g.currency = "CASHAPP".into();
            g.kind = PaymentKind::P2p;
        }
    }
    g
}

/// Base tags from the title (and labels): always starts with `active`.
pub fn derive_tags<S: AsRef<str>>(title: &str, labels: &[S], rules: &TagRules) -> Vec<String> {
    let t = title.to_lowercase();
    let hit = |words: &[String]| words.iter().any(|w| !w.is_empty() && t.contains(w.as_str()));

    let mut tags = vec!["active".to_string()];
    if hit(&rules.urgent) {
        tags.push("urgent".into());
    }
    if hit(&rules.dev) {
        tags.push("dev".into());
    }
    if hit(&rules.automation) {
        tags.push("automation".into());
    }
    if labels
        .iter()
        .any(|l| l.as_ref().to_ascii_lowercase().contains("funded"))
    {
        tags.push("funded".into());
    }
    tags
}

/// `1500.50` → `1500.5`, `200.0` → `200`.
pub fn format_amount(v: f64) -> String {
    let s = format!("{v:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_boundaries() {
        assert_eq!(crypto_token("100USDC"), Some("USDC".into()));
        assert_eq!(crypto_token("paid in sol"), Some("SOL".into()));
        assert_eq!(crypto_token("solution"), None);
        assert_eq!(crypto_token("method"), None);
    }

    #[test]
    fn labels_beat_body() {
        let g = infer_payment(&["💰 500 USDC", "funded"], "we pay via paypal");
        assert_eq!(g.kind, PaymentKind::Crypto);
        assert_eq!(g.currency, "USDC");
        assert_eq!(g.amount, "💰 500 USDC");
        assert!(g.funded);
    }

    #[test]
    fn body_fallbacks_in_order() {
        let none: [&str; 0] = [];
        assert_eq!(infer_payment(&none, "reward: 50 usdt").kind, PaymentKind::Crypto);
        let pp = infer_payment(&none, "PayPal only");
        assert_eq!((pp.currency.as_str(), pp.kind), ("PAYPAL", PaymentKind::Fiat));
        let ca = infer_payment(&none, "send via Cash App");
        assert_eq!((ca.currency.as_str(), ca.kind), ("CASHAPP", PaymentKind::P2p));
        let d = infer_payment(&none, "a solution is needed");
        assert_eq!(
            (d.amount.as_str(), d.currency.as_str(), d.kind),
            ("Funded", "USD", PaymentKind::Fiat)
        );
    }

    #[test]
    fn dollar_label_sets_amount() {
        let g = infer_payment(&["$250"], "");
        assert_eq!((g.amount.as_str(), g.currency.as_str()), ("$250", "USD"));
        assert_eq!(g.kind, PaymentKind::Fiat);
    }

    #[test]
    fn tags_from_title_and_labels() {
        let tags = derive_tags("URGENT: fix the Discord bot", &["Funded"], &TagRules::default());
        assert_eq!(tags, vec!["active", "urgent", "dev", "automation", "funded"]);
        let none: [&str; 0] = [];
        assert_eq!(derive_tags("Docs", &none, &TagRules::default()), vec!["active"]);
    }

    #[test]
    fn amount_formatting() {
        assert_eq!(format_amount(1500.5), "1500.5");
        assert_eq!(format_amount(200.0), "200");
        assert_eq!(format_amount(0.25), "0.25");
    }
}
