use std::time::Duration;

use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::settings::LogoSettings;

const FALLBACK_SIZE: &str = "96";
const FALLBACK_FORMAT: &str = "png";
const WRAPPER_KEYS: &[&str] = &["results", "data", "brands"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LogoSearchResult {
    pub domain: Option<String>,
    pub website: Option<String>,
    pub website_url: Option<String>,
    pub logo_url: Option<String>,
    #[serde(rename = "logoUrl")]
    pub logo_url_camel: Option<String>,
}

impl LogoSearchResult {
    fn site(&self) -> Option<&str> {
        [&self.domain, &self.website, &self.website_url]
            .into_iter()
            .find_map(|v| v.as_deref().filter(|s| !s.trim().is_empty()))
    }

    fn usable_logo(&self) -> Option<String> {
        [&self.logo_url, &self.logo_url_camel]
            .into_iter()
            .find_map(|v| v.as_deref().map(str::trim).filter(|u| !u.is_empty()))
            .map(String::from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoSource {
    Lookup,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoTrace {
    pub source: LogoSource,
    pub http_status: Option<u16>,
    pub result_count: Option<usize>,
    pub matched_by_domain: Option<bool>,
    pub error: Option<String>,
}

impl Default for LogoTrace {
    fn default() -> Self {
        LogoTrace {
            source: LogoSource::Fallback,
            http_status: None,
            result_count: None,
            matched_by_domain: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogoLookup {
    pub logo_url: Option<String>,
    pub trace: LogoTrace,
}

/// The search answers either with a bare array or with the array under
/// one of a few wrapper keys. Entries that don't parse are skipped.
pub fn coerce_results(body: Value) -> Vec<LogoSearchResult> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => WRAPPER_KEYS
            .iter()
            .find_map(|k| match map.remove(*k) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    };
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

/// "https://www.Brand.com/about" -> "brand.com".
pub fn normalize_domain_for_match(value: &str) -> String {
    let lowered = value.trim().to_ascii_lowercase();
    let without_scheme = lowered
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(&lowered);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

/// Prefer the result whose site is the target or one of its subdomains,
/// else the first. The flag reports a domain match.
pub fn select_logo<'a>(
    results: &'a [LogoSearchResult],
    domain: &str,
) -> Option<(&'a LogoSearchResult, bool)> {
    let target = normalize_domain_for_match(domain);
    let matched = results.iter().find(|r| {
        r.site().is_some_and(|site| {
            let site = normalize_domain_for_match(site);
            site == target || site.ends_with(&format!(".{target}"))
        })
    });
    match matched {
        Some(r) => Some((r, true)),
        None => results.first().map(|r| (r, false)),
    }
}

/// Static logo image for a domain, with the publishable token when one
/// is configured. Performs no I/O.
pub fn fallback_logo_url(image_base: &str, domain: &str, token: Option<&str>) -> Option<String> {
    let domain = domain.trim();
    if domain.is_empty() {
        return None;
    }
    let mut url = Url::parse(image_base).ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().push(domain);
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("size", FALLBACK_SIZE)
            .append_pair("format", FALLBACK_FORMAT);
        if let Some(token) = token {
            query.append_pair("token", token);
        }
    }
    Some(url.to_string())
}

/// Brand logo for the domain. Falls back to the static image URL when
/// the search is unconfigured, fails, or has nothing usable.
pub async fn lookup_logo_url(
    client: &Client,
    settings: &LogoSettings,
    timeout: Duration,
    domain: &str,
) -> LogoLookup {
    let mut trace = LogoTrace::default();
    let fallback = |trace: LogoTrace| LogoLookup {
        logo_url: fallback_logo_url(&settings.image_base, domain, settings.publishable_key()),
        trace,
    };

    let Some(secret) = settings.secret_key() else {
        debug!(%domain, "Logo search not configured, using fallback");
        return fallback(trace);
    };

    let sent = client
        .get(&settings.search_endpoint)
        .query(&[("q", domain)])
        .bearer_auth(secret)
        .header(header::ACCEPT, "application/json")
        .timeout(timeout)
        .send()
        .await;

    let response = match sent {
        Ok(r) => r,
        Err(e) => {
            warn!(%domain, error = %e, "Logo search failed");
            trace.error = Some(e.to_string());
            return fallback(trace);
        }
    };

    let status = response.status();
    trace.http_status = Some(status.as_u16());
    if !status.is_success() {
        warn!(%domain, %status, "Logo search returned an error status");
        trace.error = Some(format!("logo search returned {status}"));
        return fallback(trace);
    }

    let body: Value = match response.json().await {
        Ok(b) => b,
        Err(e) => {
            warn!(%domain, error = %e, "Logo search response was not JSON");
            trace.error = Some(e.to_string());
            return fallback(trace);
        }
    };

    let results = coerce_results(body);
    trace.result_count = Some(results.len());
    let Some((result, by_domain)) = select_logo(&results, domain) else {
        return fallback(trace);
    };
    trace.matched_by_domain = Some(by_domain);

    match result.usable_logo() {
        Some(logo_url) => {
            trace.source = LogoSource::Lookup;
            debug!(%domain, %logo_url, matched_by_domain = by_domain, "Logo search hit");
            LogoLookup {
                logo_url: Some(logo_url),
                trace,
            }
        }
        None => fallback(trace),
    }
}
