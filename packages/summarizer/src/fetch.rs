use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::LazyLock;
use std::time::Duration;

use common::config::FetchConfig;
use regex::Regex;
use reqwest::{Url, redirect};
use tracing::{debug, warn};

use crate::FetchError;

static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b.*?</(script|style)\s*>").expect("valid script pattern")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

/// Check a user-supplied URL against the fetch policy without touching the
/// network: http(s) only, a host, no credentials, default ports only, and no
/// local hostnames.
pub fn validate_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw.trim()).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::Forbidden("only http and https are allowed".into()));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(FetchError::Forbidden("credentials are not allowed".into()));
    }
    let host = url
        .host_str()
        .ok_or_else(|| FetchError::InvalidUrl("missing host".into()))?
        .to_ascii_lowercase();
    if !matches!(url.port_or_known_default(), Some(80) | Some(443)) {
        return Err(FetchError::Forbidden("only ports 80 and 443 are allowed".into()));
    }
    if host == "localhost" || host.ends_with(".localhost") || host.ends_with(".local") {
        return Err(FetchError::Forbidden("local hostnames are not allowed".into()));
    }
    Ok(url)
}

/// Whether an address is routable on the public internet.
pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_public_v4(v4),
            None => is_public_v6(v6),
        },
    }
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    !(ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_broadcast()
        || ip.is_unspecified()
        || ip.is_documentation()
        || a == 0
        || (a == 100 && (64..128).contains(&b))
        || (a == 198 && (18..20).contains(&b))
        || a >= 240)
}

fn is_public_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    !(ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
        || (first == 0x2001 && ip.segments()[1] == 0x0db8))
}

/// Reduce an HTML document to its visible text.
pub fn html_to_text(html: &str) -> String {
    let without_code = SCRIPT_OR_STYLE.replace_all(html, " ");
    let without_tags = TAG.replace_all(&without_code, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fetches remote documents for URL jobs.
///
/// Every resolved address must be public; the connection is then pinned to
/// the vetted address so a second DNS answer cannot redirect it.
#[derive(Debug, Clone)]
pub struct UrlFetcher {
    config: FetchConfig,
}

impl UrlFetcher {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    async fn resolve(&self, url: &Url) -> Result<SocketAddr, FetchError> {
        let host = url
            .host_str()
            .ok_or_else(|| FetchError::InvalidUrl("missing host".into()))?;
        let port = url.port_or_known_default().unwrap_or(443);
        let lookup_host = host.trim_start_matches('[').trim_end_matches(']');

        let addrs: Vec<SocketAddr> = tokio::time::timeout(
            Duration::from_secs(self.config.dns_timeout_secs),
            tokio::net::lookup_host((lookup_host, port)),
        )
        .await
        .map_err(|_| FetchError::Resolve)?
        .map_err(|_| FetchError::Resolve)?
        .collect();

        if addrs.is_empty() {
            return Err(FetchError::Resolve);
        }
        if let Some(blocked) = addrs.iter().find(|a| !is_public_ip(a.ip())) {
            warn!(host, ip = %blocked.ip(), "Refusing to fetch non-public address");
            return Err(FetchError::Forbidden("address is not public".into()));
        }
        Ok(addrs[0])
    }

    /// Fetch `raw` and return its text content.
    pub async fn fetch_text(&self, raw: &str) -> Result<String, FetchError> {
        let url = validate_url(raw)?;
        let addr = self.resolve(&url).await?;

        let mut builder = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(Duration::from_secs(self.config.timeout_secs));
        if let Some(host) = url.domain() {
            builder = builder.resolve(host, addr);
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        debug!(url = %url, ip = %addr.ip(), "Fetching document");
        let mut response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("html"));

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?
        {
            if body.len() + chunk.len() > self.config.max_bytes {
                return Err(FetchError::TooLarge(self.config.max_bytes));
            }
            body.extend_from_slice(&chunk);
        }

        let text = String::from_utf8(body).map_err(|_| FetchError::NotText)?;
        Ok(if is_html { html_to_text(&text) } else { text })
    }
}
