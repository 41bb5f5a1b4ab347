// src/ingest/url_guard.rs
//! URL safety and reachability checks used by the funnel.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use reqwest::header::RANGE;
use reqwest::StatusCode;
use url::{Host, Url};

/// http(s) only; local hosts are refused unless `allow_local` is set.
pub fn is_safe_url(raw: &str, allow_local: bool) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("unparseable url: {e}"))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme {other:?}")),
    }
    let host = url.host().ok_or_else(|| "missing host".to_string())?;
    if allow_local {
        return Ok(url);
    }
    let local = match &host {
        Host::Domain(d) => {
            let d = d.trim_end_matches('.').to_ascii_lowercase();
            d == "localhost" || d.ends_with(".localhost")
        }
        Host::Ipv4(ip) => is_local_v4(ip),
        Host::Ipv6(ip) => is_local_v6(ip),
    };
    if local {
        return Err(format!("local host {host} not allowed"));
    }
    Ok(url)
}

fn is_local_v4(ip: &Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_unspecified() || ip.is_link_local()
}

fn is_local_v6(ip: &Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_local_v4(&v4);
    }
    // fe80::/10
    ip.is_loopback() || ip.is_unspecified() || (ip.segments()[0] & 0xffc0) == 0xfe80
}

/// HEAD probe with a ranged-GET fallback.
#[derive(Clone)]
pub struct ReachabilityProbe {
    http: reqwest::Client,
    timeout: Duration,
}

impl ReachabilityProbe {
    pub fn new(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    pub async fn is_reachable(&self, url: &str) -> bool {
        match self.http.head(url).timeout(self.timeout).send().await {
            Ok(resp) if resp.status() != StatusCode::METHOD_NOT_ALLOWED => {
                return acceptable(resp.status(), false);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(target: "funnel", error = %e, "HEAD failed, trying ranged GET");
            }
        }
        match self
            .http
            .get(url)
            .header(RANGE, "bytes=0-0")
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(resp) => acceptable(resp.status(), true),
            Err(_) => false,
        }
    }
}

fn acceptable(status: StatusCode, ranged: bool) -> bool {
    if status.is_success() || status.is_redirection() {
        return true;
    }
    matches!(status.as_u16(), 401 | 403 | 405 | 429) || (ranged && status.as_u16() == 416)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schemes_and_local_hosts() {
        assert!(is_safe_url("https://github.com/a/b", false).is_ok());
        assert!(is_safe_url("javascript:alert(1)", false).is_err());
        assert!(is_safe_url("ftp://x.io/f", false).is_err());
        assert!(is_safe_url("http://localhost:8080/", false).is_err());
        assert!(is_safe_url("http://api.localhost/", false).is_err());
        assert!(is_safe_url("http://127.0.0.1/", false).is_err());
        assert!(is_safe_url("http://0.0.0.0/", false).is_err());
        assert!(is_safe_url("http://169.254.169.254/", false).is_err());
        assert!(is_safe_url("http://[::1]/", false).is_err());
        assert!(is_safe_url("http://[fe80::1]/", false).is_err());
        assert!(is_safe_url("http://127.0.0.1:3000/x", true).is_ok());
        assert!(is_safe_url("", false).is_err());
    }

    #[test]
    fn probe_status_table() {
        assert!(acceptable(StatusCode::OK, false));
        assert!(acceptable(StatusCode::MOVED_PERMANENTLY, false));
        assert!(acceptable(StatusCode::FORBIDDEN, false));
        assert!(acceptable(StatusCode::TOO_MANY_REQUESTS, false));
        assert!(!acceptable(StatusCode::NOT_FOUND, false));
        assert!(!acceptable(StatusCode::RANGE_NOT_SATISFIABLE, false));
        assert!(acceptable(StatusCode::RANGE_NOT_SATISFIABLE, true));
        assert!(!acceptable(StatusCode::INTERNAL_SERVER_ERROR, true));
    }
}
