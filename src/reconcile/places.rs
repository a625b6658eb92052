use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::extract::address::looks_like_street_address;
use crate::settings::PlacesSettings;

const FIELD_MASK: &str = "places.formattedAddress,places.websiteUri";
const MAX_RESULTS: u32 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceCandidate {
    pub formatted_address: Option<String>,
    pub website_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchTextResponse {
    #[serde(default)]
    places: Vec<PlaceCandidate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingApiKey,
    MissingQueryParts,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacesTrace {
    pub enabled: bool,
    pub skipped: Option<SkipReason>,
    pub query: Option<String>,
    pub http_status: Option<u16>,
    pub result_count: Option<usize>,
    pub matched_by_website: Option<bool>,
    pub selected_address: Option<String>,
    pub selected_website: Option<String>,
    pub candidates: Vec<PlaceCandidate>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PlacesLookup {
    pub address: Option<String>,
    pub trace: PlacesTrace,
}

pub fn build_query(agency_name: Option<&str>, domain: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [agency_name, domain]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(" "))
}

/// A bare "host:port" parses with the host as its scheme, so anything
/// without a host is retried as https.
fn host_of(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let parse_host = |raw: &str| {
        url::Url::parse(raw)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
    };
    let host = parse_host(trimmed).or_else(|| parse_host(&format!("https://{trimmed}")))?;
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Same site when either host equals or is a subdomain of the other.
pub fn domain_matches_website(domain: &str, website: Option<&str>) -> bool {
    let Some(site) = website.and_then(host_of) else {
        return false;
    };
    let domain = domain.trim().to_ascii_lowercase();
    let domain = domain.strip_prefix("www.").unwrap_or(&domain);
    if domain.is_empty() {
        return false;
    }
    site == domain
        || site.ends_with(&format!(".{domain}"))
        || domain.ends_with(&format!(".{site}"))
}

/// Website match first, then anything that reads like a street address,
/// then whatever came back first. The flag reports a website match.
pub fn select_candidate<'a>(
    candidates: &'a [PlaceCandidate],
    domain: &str,
) -> Option<(&'a PlaceCandidate, bool)> {
    if let Some(hit) = candidates
        .iter()
        .find(|c| domain_matches_website(domain, c.website_uri.as_deref()))
    {
        return Some((hit, true));
    }
    candidates
        .iter()
        .find(|c| {
            c.formatted_address
                .as_deref()
                .is_some_and(looks_like_street_address)
        })
        .or_else(|| candidates.first())
        .map(|c| (c, false))
}

/// Look the agency up in the places index. Never fails; every problem
/// leaves the address empty and is noted in the trace.
pub async fn lookup_agency_address(
    client: &Client,
    settings: &PlacesSettings,
    timeout: Duration,
    agency_name: Option<&str>,
    domain: &str,
) -> PlacesLookup {
    let mut trace = PlacesTrace::default();

    let Some(api_key) = settings.api_key() else {
        trace.skipped = Some(SkipReason::MissingApiKey);
        return PlacesLookup { address: None, trace };
    };
    trace.enabled = true;

    let Some(query) = build_query(agency_name, Some(domain)) else {
        trace.skipped = Some(SkipReason::MissingQueryParts);
        return PlacesLookup { address: None, trace };
    };
    trace.query = Some(query.clone());

    let sent = client
        .post(&settings.endpoint)
        .header("X-Goog-Api-Key", api_key)
        .header("X-Goog-FieldMask", FIELD_MASK)
        .timeout(timeout)
        .json(&json!({
            "textQuery": query,
            "languageCode": "en",
            "regionCode": "US",
            "maxResultCount": MAX_RESULTS,
        }))
        .send()
        .await;

    let response = match sent {
        Ok(r) => r,
        Err(e) => {
            warn!(%domain, error = %e, "Places lookup failed");
            trace.error = Some(e.to_string());
            return PlacesLookup { address: None, trace };
        }
    };

    let status = response.status();
    trace.http_status = Some(status.as_u16());
    if !status.is_success() {
        warn!(%domain, %status, "Places lookup returned an error status");
        trace.error = Some(format!("places lookup returned {status}"));
        return PlacesLookup { address: None, trace };
    }

    let body: SearchTextResponse = match response.json().await {
        Ok(b) => b,
        Err(e) => {
            warn!(%domain, error = %e, "Places response was not understood");
            trace.error = Some(e.to_string());
            return PlacesLookup { address: None, trace };
        }
    };

    trace.result_count = Some(body.places.len());
    let selected = select_candidate(&body.places, domain);
    let address = selected
        .and_then(|(c, _)| c.formatted_address.as_deref())
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(String::from);

    if let Some((candidate, by_website)) = selected {
        trace.matched_by_website = Some(by_website);
        trace.selected_address = candidate.formatted_address.clone();
        trace.selected_website = candidate.website_uri.clone();
    }
    debug!(
        %domain,
        results = body.places.len(),
        matched_by_website = ?trace.matched_by_website,
        address = ?address,
        "Places lookup finished"
    );
    trace.candidates = body.places;

    PlacesLookup { address, trace }
}
