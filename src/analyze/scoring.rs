//! Additive priority score.
//!
//! Every factor contributes a fixed number of points; there is no clamping and
//! nothing multiplies. `explain` returns the same factors `score` sums, so the
//! breakdown always adds up to the score.
//!
//! - payment tier on the currency code: crypto 50, p2p 45, fiat 25, other 5
//! - title keywords: urgency 30, dev task 15, automation 20, security 25, audit 35
//! - recency: < 1 h 40, < 6 h 25, < 24 h 10 (future timestamps count as fresh)
//! - platform bonus on the origin (configurable)
//! - tags: `urgent` 20, `hot` 15, `deadline` 10, per tag

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::heuristics::Heuristics;
use crate::ingest::types::CandidateRecord;

/// One named contribution to a score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreFactor {
    pub name: &'static str,
    pub points: i64,
}

#[derive(Debug, Clone)]
pub struct Scorer {
    h: Arc<Heuristics>,
}

impl Scorer {
    pub fn new(h: Arc<Heuristics>) -> Self {
        Self { h }
    }

    pub fn score(&self, rec: &CandidateRecord, now: DateTime<Utc>) -> i64 {
        self.explain(rec, now).iter().map(|f| f.points).sum()
    }

    /// Non-zero factors in evaluation order.
    pub fn explain(&self, rec: &CandidateRecord, now: DateTime<Utc>) -> Vec<ScoreFactor> {
        let mut out = Vec::new();
        let mut add = |name: &'static str, points: i64| {
            if points != 0 {
                out.push(ScoreFactor { name, points });
            }
        };

        let h = &self.h;
        let tier = if contains_currency(&rec.payment_currency, &h.crypto_currencies) {
            ("payment_crypto", 50)
        } else if contains_currency(&rec.payment_currency, &h.p2p_methods) {
            ("payment_p2p", 45)
        } else if contains_currency(&rec.payment_currency, &h.fiat_methods) {
            ("payment_fiat", 25)
        } else {
            ("payment_other", 5)
        };
        add(tier.0, tier.1);

        let title = rec.title.to_uppercase();
        if contains_any(&title, &h.urgency_keywords) {
            add("kw_urgency", 30);
        }
        if contains_any(&title, &h.dev_task_keywords) {
            add("kw_dev_task", 15);
        }
        if contains_any(&title, &h.automation_keywords) {
            add("kw_automation", 20);
        }
        if contains_any(&title, &h.security_keywords) {
            add("kw_security", 25);
        }
        if contains_any(&title, &h.audit_keywords) {
            add("kw_audit", 35);
        }

        add("recency", recency_points(now - rec.created_at));

        let origin = rec.origin.to_uppercase();
        let platform: i64 = h
            .platform_bonuses
            .iter()
            .filter(|b| b.patterns.iter().any(|p| origin.contains(p.as_str())))
            .map(|b| b.points as i64)
            .sum();
        add("platform", platform);

        let mut tags = 0i64;
        for t in &rec.tags {
            let t = t.to_uppercase();
            if t.contains("URGENT") {
                tags += 20;
            }
            if t.contains("HOT") {
                tags += 15;
            }
            if t.contains("DEADLINE") {
                tags += 10;
            }
        }
        add("tags", tags);

        out
    }
}

fn recency_points(age: Duration) -> i64 {
    if age < Duration::hours(1) {
        40
    } else if age < Duration::hours(6) {
        25
    } else if age < Duration::hours(24) {
        10
    } else {
        0
    }
}

fn contains_any(upper_text: &str, keywords: &[String]) -> bool {
    keywords
        .iter()
        .any(|k| !k.is_empty() && upper_text.contains(k.as_str()))
}

/// Case-insensitive substring match, also with spaces removed on both sides.
pub fn contains_currency(value: &str, tokens: &[String]) -> bool {
    let upper = value.to_uppercase();
    let compact = upper.replace(' ', "");
    tokens.iter().any(|t| {
        if t.is_empty() {
            return false;
        }
        let target = t.to_uppercase();
        let target_compact = target.replace(' ', "");
        upper.contains(&target) || (!target_compact.is_empty() && compact.contains(&target_compact))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::PaymentKind;

    fn rec(title: &str, currency: &str, origin: &str, age: Duration) -> (CandidateRecord, DateTime<Utc>) {
        let now = Utc::now();
        (
            CandidateRecord {
                source_id: "t".into(),
                external_id: "1".into(),
                title: title.into(),
                description: String::new(),
                source_url: "https://x.io/1".into(),
                created_at: now - age,
                expires_at: None,
                payment_amount: "1".into(),
                payment_currency: currency.into(),
                payment_kind: PaymentKind::Unknown,
                tags: vec![],
                origin: origin.into(),
            },
            now,
        )
    }

    fn scorer() -> Scorer {
        Scorer::new(Arc::new(Heuristics::default()))
    }

    #[test]
    fn tiers_in_order() {
        let s = scorer();
        let day = Duration::days(2);
        let score = |c: &str| {
            let (r, now) = rec("Docs", c, "X", day);
            s.score(&r, now)
        };
        assert_eq!(score("USDC"), 50);
        assert_eq!(score("cash app"), 45);
        assert_eq!(score("PayPal"), 25);
        assert_eq!(score(""), 5);
    }

    #[test]
    fn recency_bands_and_future() {
        assert_eq!(recency_points(Duration::minutes(59)), 40);
        assert_eq!(recency_points(Duration::hours(1)), 25);
        assert_eq!(recency_points(Duration::hours(23)), 10);
        assert_eq!(recency_points(Duration::hours(24)), 0);
        assert_eq!(recency_points(Duration::hours(-3)), 40);
    }

    #[test]
    fn audit_is_not_double_counted_as_security() {
        let s = scorer();
        let (r, now) = rec("Smart audit", "", "X", Duration::days(3));
        let f = s.explain(&r, now);
        assert!(f.iter().any(|x| x.name == "kw_audit"));
        assert!(!f.iter().any(|x| x.name == "kw_security"));
    }

    #[test]
    fn platform_and_tag_bonuses() {
        let s = scorer();
        let (mut r, now) = rec("Docs", "", "IMMUNEFI", Duration::days(3));
        r.tags = vec!["urgent".into(), "hot-deadline".into()];
        // 5 + 30 + 20 + (15 + 10)
        assert_eq!(s.score(&r, now), 80);
    }

    #[test]
    fn explain_sums_to_score() {
        let s = scorer();
        let (r, now) = rec("URGENT bot fix for hack audit", "SOL", "SUPERTEAM", Duration::minutes(5));
        let total: i64 = s.explain(&r, now).iter().map(|f| f.points).sum();
        assert_eq!(total, s.score(&r, now));
    }
}
