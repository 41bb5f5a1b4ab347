// src/ingest/validate.rs
//! Response page validation.
//!
//! A page is decoded into its wire type and every item is checked before any
//! record is built from it. Under `FailClosed` (the default) one bad item
//! rejects the whole page; `DropInvalid` only drops the offending items.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::error::ScanError;

pub const MAX_TITLE_CHARS: usize = 500;

static RE_INJECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)<script[^>]*>|</script\s*>|javascript:|<[a-z][^>]*[\s/"']on[a-z]+\s*=|\bon(error|click|load|mouseover|focus|blur|submit)\s*="#,
    )
    .expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    #[default]
    FailClosed,
    DropInvalid,
}

/// One item of a source page as seen by the validator.
pub trait PageItem {
    /// Whether this wire format carries a creation timestamp at all.
    const HAS_CREATED_AT: bool = true;

    fn title(&self) -> &str;
    fn url(&self) -> Option<Cow<'_, str>>;
    fn created_at(&self) -> Option<&str> {
        None
    }
    /// Free text scanned for injection besides the title.
    fn body(&self) -> &str {
        ""
    }
}

/// A decoded response page.
pub trait Page: DeserializeOwned {
    type Item: PageItem;
    fn into_items(self) -> Vec<Self::Item>;
}

/// Items that passed validation, plus how many the page carried before any
/// were dropped. Pagination compares `raw_len` against the page size.
#[derive(Debug)]
pub struct ValidatedPage<T> {
    pub items: Vec<T>,
    pub raw_len: usize,
}

/// Decode `raw` as `P` and check every item.
pub fn validate<P: Page>(raw: &[u8], mode: ValidationMode) -> Result<ValidatedPage<P::Item>, ScanError> {
    if raw.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ScanError::MalformedResponse("empty response body".into()));
    }
    let page: P = serde_json::from_slice(raw)
        .map_err(|e| ScanError::MalformedResponse(format!("invalid JSON: {e}")))?;

    let items = page.into_items();
    let raw_len = items.len();
    let mut out = Vec::with_capacity(raw_len);
    for (index, item) in items.into_iter().enumerate() {
        match check_item(index, &item) {
            Ok(()) => out.push(item),
            Err(e) if mode == ValidationMode::DropInvalid => {
                tracing::warn!(target: "ingest", index, error = %e, "dropping invalid item");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(ValidatedPage { items: out, raw_len })
}

fn check_item<T: PageItem>(index: usize, item: &T) -> Result<(), ScanError> {
    let bad = |reason: String| ScanError::MalformedResponse(format!("item {index}: {reason}"));

    let title = item.title();
    if title.trim().is_empty() {
        return Err(bad("title cannot be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(bad(format!("title too long (max {MAX_TITLE_CHARS} characters)")));
    }

    let url = item.url().unwrap_or_default();
    if url.trim().is_empty() {
        return Err(bad("url cannot be empty".into()));
    }
    Url::parse(url.trim()).map_err(|e| bad(format!("invalid url: {e}")))?;

    if T::HAS_CREATED_AT {
        let ts = item.created_at().unwrap_or_default();
        chrono::DateTime::parse_from_rfc3339(ts.trim())
            .map_err(|e| bad(format!("invalid created_at {ts:?} (expected RFC3339): {e}")))?;
    }

    for (field, text) in [("title", title), ("body", item.body())] {
        if let Some(hit) = find_injection(text) {
            return Err(ScanError::UnsafeContent {
                index,
                reason: format!("{field} contains {hit:?}"),
            });
        }
    }
    Ok(())
}

/// First injection pattern found in `text` or its entity-decoded form.
pub fn find_injection(text: &str) -> Option<String> {
    if let Some(m) = RE_INJECTION.find(text) {
        return Some(m.as_str().to_string());
    }
    let decoded = html_escape::decode_html_entities(text);
    RE_INJECTION.find(&decoded).map(|m| m.as_str().to_string())
}
