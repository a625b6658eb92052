use std::time::Instant;

use reqwest::Client;
use tracing::info;
use url::Url;

use crate::error::ScrubError;
use crate::extract::address::{normalize_address, parse_address_segments};
use crate::extract::photos::{pick_headshot, without_excluded};
use crate::extract::{self, PageFields};
use crate::fetch::fetch_page;
use crate::html::PageDocument;
use crate::profile::{DebugTrace, ExtractedProfile, ScrubRequest};
use crate::reconcile::{logo, places};
use crate::settings::Settings;

/// Runs scrubs. Holds no per-request state; clone freely.
#[derive(Debug, Clone)]
pub struct Scrubber {
    client: Client,
    settings: Settings,
}

/// Validate the input URL and derive the display domain (host without a
/// leading `www.`, lowercased).
pub fn parse_target(raw: &str) -> Result<(Url, String), ScrubError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ScrubError::MissingUrl);
    }
    let url = Url::parse(trimmed).map_err(|_| ScrubError::InvalidUrl)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ScrubError::InvalidUrl);
    }
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(ScrubError::InvalidUrl)?
        .to_ascii_lowercase();
    let domain = host.strip_prefix("www.").unwrap_or(&host).to_string();
    Ok((url, domain))
}

impl Scrubber {
    pub fn new(settings: Settings) -> reqwest::Result<Self> {
        let client = Client::builder().user_agent(&settings.user_agent).build()?;
        Ok(Scrubber { client, settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn scrub(&self, request: &ScrubRequest) -> Result<ExtractedProfile, ScrubError> {
        let start = Instant::now();
        let (url, domain) = parse_target(&request.url)?;

        let raw = fetch_page(&self.client, &url, &domain, &self.settings).await?;
        let doc = PageDocument::parse(&raw);
        let page = extract::extract_all(&doc, &url, &domain);

        let lookup_timeout = self.settings.lookup_timeout();
        let (places, logo) = tokio::join!(
            places::lookup_agency_address(
                &self.client,
                &self.settings.places,
                lookup_timeout,
                page.agency_name.as_deref(),
                &domain,
            ),
            logo::lookup_logo_url(&self.client, &self.settings.logo, lookup_timeout, &domain),
        );

        let PageFields {
            name,
            agency_name,
            role,
            email,
            phone,
            license_numbers,
            scraped_address,
            photo_candidates,
        } = page;

        let photo_candidates = without_excluded(&photo_candidates, &request.exclude_photos);
        let photo_url = pick_headshot(&photo_candidates);

        let agency_address = normalize_address(places.address.as_deref().or(scraped_address.as_deref()));
        let agency_address_parts = parse_address_segments(agency_address.as_deref());

        let debug = request.debug.then(|| DebugTrace {
            places: places.trace,
            scraped_agency_address: scraped_address.clone(),
            normalized_agency_address: agency_address.clone(),
            logo: logo.trace,
        });

        info!(
            %domain,
            photos = photo_candidates.len(),
            has_address = agency_address.is_some(),
            has_logo = logo.logo_url.is_some(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Scrubbed profile"
        );

        Ok(ExtractedProfile {
            url: request.url.trim().to_string(),
            domain,
            name,
            role,
            email,
            phone,
            license_numbers,
            photo_url,
            photo_candidates,
            logo_url: logo.logo_url,
            agency_name,
            agency_address,
            agency_address_parts,
            debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::settings::{LogoSettings, PlacesSettings};

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{name}")).unwrap()
    }

    fn settings(server: &MockServer, places_key: Option<&str>, logo_key: Option<&str>) -> Settings {
        Settings {
            places: PlacesSettings {
                api_key: places_key.map(String::from),
                endpoint: server.url("/v1/places:searchText"),
            },
            logo: LogoSettings {
                secret_key: logo_key.map(String::from),
                publishable_key: None,
                search_endpoint: server.url("/logo/search"),
                image_base: "https://img.logo.dev".to_string(),
            },
            ..Settings::default()
        }
    }

    #[test]
    fn targets() {
        let (url, domain) = parse_target("  https://WWW.SunsetRealty.com/agents/jane ").unwrap();
        assert_eq!(url.as_str(), "https://www.sunsetrealty.com/agents/jane");
        assert_eq!(domain, "sunsetrealty.com");

        assert!(matches!(parse_target(""), Err(ScrubError::MissingUrl)));
        assert!(matches!(parse_target("   "), Err(ScrubError::MissingUrl)));
        assert!(matches!(parse_target("not a url"), Err(ScrubError::InvalidUrl)));
        assert!(matches!(parse_target("ftp://sunsetrealty.com"), Err(ScrubError::InvalidUrl)));
        assert!(matches!(parse_target("mailto:jane@sunsetrealty.com"), Err(ScrubError::InvalidUrl)));
    }

    #[tokio::test]
    async fn full_pipeline_with_enrichment() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/agents/jane-doe");
                then.status(200)
                    .header("content-type", "text/html")
                    .body(fixture("agent_profile.html"));
            })
            .await;
        let places_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/places:searchText");
                then.status(200).json_body(json!({
                    "places": [
                        {"formattedAddress": "1 Other Rd, Dayton, OH 45402, USA", "websiteUri": "https://other.com"},
                        {"formattedAddress": "410 E Main Street, Chattanooga, TN 37408, USA", "websiteUri": "http://127.0.0.1/"}
                    ]
                }));
            })
            .await;
        let logo_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/logo/search");
                then.status(200).json_body(json!({"data": [{"domain": "127.0.0.1", "logoUrl": "https://logos.test/sunset.png"}]}));
            })
            .await;

        let scrubber = Scrubber::new(settings(&server, Some("pk"), Some("sk"))).unwrap();
        let request = ScrubRequest::new(server.url("/agents/jane-doe")).with_debug(true);
        let profile = scrubber.scrub(&request).await.unwrap();

        places_mock.assert_async().await;
        logo_mock.assert_async().await;

        assert_eq!(profile.domain, "127.0.0.1");
        assert_eq!(profile.name.as_deref(), Some("Jane Doe"));
        assert_eq!(profile.agency_name.as_deref(), Some("Sunset Realty"));
        assert_eq!(profile.role.as_deref(), Some("Realtor"));
        assert_eq!(profile.email.as_deref(), Some("jane@sunsetrealty.com"));
        assert_eq!(profile.phone.as_deref(), Some("+1 (423) 555-0199"));
        assert_eq!(profile.license_numbers, vec!["339012".to_string()]);
        assert_eq!(profile.logo_url.as_deref(), Some("https://logos.test/sunset.png"));
        assert_eq!(
            profile.agency_address.as_deref(),
            Some("410 E Main Street, Chattanooga, TN 37408")
        );
        let parts = profile.agency_address_parts.as_ref().unwrap();
        assert_eq!(parts.city.as_deref(), Some("Chattanooga"));
        assert_eq!(parts.zip_code.as_deref(), Some("37408"));

        assert_eq!(profile.photo_url, profile.photo_candidates.first().cloned());
        assert!(profile.photo_url.as_deref().unwrap().ends_with("/uploads/jane-doe-headshot.jpg"));

        let debug = profile.debug.as_ref().unwrap();
        assert_eq!(debug.places.matched_by_website, Some(true));
        assert_eq!(debug.places.query.as_deref(), Some("Sunset Realty 127.0.0.1"));
        assert_eq!(
            debug.scraped_agency_address.as_deref(),
            Some("400 E Main St, Chattanooga, TN 37408 Hours")
        );
        assert_eq!(debug.logo.source, logo::LogoSource::Lookup);
    }

    #[tokio::test]
    async fn profile_echoes_the_requested_url() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200).body(fixture("agency_home.html"));
            })
            .await;

        let scrubber = Scrubber::new(settings(&server, None, None)).unwrap();
        let requested = server.base_url();
        let profile = scrubber
            .scrub(&ScrubRequest::new(format!("  {requested} ")))
            .await
            .unwrap();
        assert_eq!(profile.url, requested);
        assert!(!profile.url.ends_with('/'));
    }

    #[tokio::test]
    async fn slow_lookups_time_out_together() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/agents/jane-doe");
                then.status(200).body(fixture("agent_profile.html"));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/places:searchText");
                then.status(200)
                    .delay(Duration::from_secs(3))
                    .json_body(json!({"places": [{"formattedAddress": "9 Late Rd, Dayton, OH 45402"}]}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/logo/search");
                then.status(200)
                    .delay(Duration::from_secs(3))
                    .json_body(json!([{"domain": "127.0.0.1", "logo_url": "https://logos.test/late.png"}]));
            })
            .await;

        let scrubber = Scrubber::new(Settings {
            lookup_timeout_ms: 800,
            ..settings(&server, Some("pk"), Some("sk"))
        })
        .unwrap();
        let started = Instant::now();
        let profile = scrubber
            .scrub(&ScrubRequest::new(server.url("/agents/jane-doe")).with_debug(true))
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(
            profile.agency_address.as_deref(),
            Some("400 E Main St, Chattanooga, TN 37408")
        );
        assert_eq!(
            profile.logo_url.as_deref(),
            Some("https://img.logo.dev/127.0.0.1?size=96&format=png")
        );
        let debug = profile.debug.as_ref().unwrap();
        assert!(debug.places.error.is_some());
        assert_eq!(debug.places.http_status, None);
        assert!(debug.logo.error.is_some());
        assert_eq!(debug.logo.source, logo::LogoSource::Fallback);
        // Two 800ms timeouts back to back would pass 1.6s.
        assert!(elapsed < Duration::from_millis(1_400), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn places_failure_keeps_page_fields() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/agents/jane-doe");
                then.status(200).body(fixture("agent_profile.html"));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/places:searchText");
                then.status(500);
            })
            .await;

        let scrubber = Scrubber::new(settings(&server, Some("pk"), None)).unwrap();
        let profile = scrubber
            .scrub(&ScrubRequest::new(server.url("/agents/jane-doe")))
            .await
            .unwrap();

        assert_eq!(profile.name.as_deref(), Some("Jane Doe"));
        assert_eq!(profile.email.as_deref(), Some("jane@sunsetrealty.com"));
        assert_eq!(
            profile.agency_address.as_deref(),
            Some("400 E Main St, Chattanooga, TN 37408")
        );
        assert_eq!(
            profile.logo_url.as_deref(),
            Some("https://img.logo.dev/127.0.0.1?size=96&format=png")
        );
        assert!(profile.debug.is_none());
    }

    #[tokio::test]
    async fn excluded_photos_never_return() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/agents/jane-doe");
                then.status(200).body(fixture("agent_profile.html"));
            })
            .await;

        let headshot = server.url("/uploads/jane-doe-headshot.jpg");
        let listing = server.url("/images/listing-1.jpg");
        let scrubber = Scrubber::new(settings(&server, None, None)).unwrap();
        let request = ScrubRequest::new(server.url("/agents/jane-doe")).exclude([headshot.clone()]);
        let profile = scrubber.scrub(&request).await.unwrap();

        assert!(!profile.photo_candidates.contains(&headshot));
        assert_eq!(profile.photo_candidates.len(), 4);
        assert_eq!(profile.photo_url.as_deref(), Some(listing.as_str()));

        let everything = ScrubRequest::new(server.url("/agents/jane-doe")).exclude(profile.photo_candidates.clone());
        let profile = scrubber.scrub(&everything.exclude([headshot])).await.unwrap();
        assert!(profile.photo_candidates.is_empty());
        assert_eq!(profile.photo_url, None);
    }

    #[tokio::test]
    async fn timeout_and_error_status_read_differently() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/slow");
                then.status(200).delay(Duration::from_secs(2)).body("<p>late</p>");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing");
                then.status(503);
            })
            .await;

        let scrubber = Scrubber::new(Settings {
            fetch_timeout_ms: 200,
            ..settings(&server, None, None)
        })
        .unwrap();

        let slow = scrubber.scrub(&ScrubRequest::new(server.url("/slow"))).await.unwrap_err();
        let missing = scrubber.scrub(&ScrubRequest::new(server.url("/missing"))).await.unwrap_err();
        assert_eq!(slow.to_string(), "The website took too long to respond.");
        assert_eq!(missing.to_string(), "Unable to reach 127.0.0.1");
        assert_ne!(slow.to_string(), missing.to_string());
    }

    #[tokio::test]
    async fn input_errors_fail_before_io() {
        let scrubber = Scrubber::new(Settings::default()).unwrap();
        let missing = scrubber.scrub(&ScrubRequest::default()).await.unwrap_err();
        let invalid = scrubber.scrub(&ScrubRequest::new("sunsetrealty")).await.unwrap_err();
        assert!(missing.is_input_error());
        assert_eq!(missing.to_string(), "URL is required.");
        assert_eq!(invalid.to_string(), "Enter a valid URL.");
    }
}
