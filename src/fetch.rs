use std::time::Instant;

use reqwest::{header, Client};
use tracing::{debug, info};
use url::Url;

use crate::error::ScrubError;
use crate::settings::Settings;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml";

/// Fetch the target page. Non-2xx is terminal; the body is cut at
/// `max_html_bytes` rather than failing.
pub async fn fetch_page(
    client: &Client,
    url: &Url,
    domain: &str,
    settings: &Settings,
) -> Result<String, ScrubError> {
    let start = Instant::now();
    let mut response = client
        .get(url.clone())
        .header(header::ACCEPT, ACCEPT_HTML)
        .timeout(settings.fetch_timeout())
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        info!(%domain, %status, "Target page returned an error status");
        return Err(ScrubError::Unreachable {
            domain: domain.to_string(),
        });
    }

    let mut body: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        body.extend_from_slice(&chunk);
        if body.len() >= settings.max_html_bytes {
            debug!(%domain, limit = settings.max_html_bytes, "Truncating oversized page");
            body.truncate(settings.max_html_bytes);
            break;
        }
    }

    // Drop a multi-byte character split by the cut.
    if let Err(err) = std::str::from_utf8(&body) {
        if err.error_len().is_none() {
            body.truncate(err.valid_up_to());
        }
    }

    info!(
        %domain,
        bytes = body.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Fetched profile page"
    );
    Ok(String::from_utf8_lossy(&body).into_owned())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::prelude::*;

    use super::*;

    fn client() -> Client {
        Client::builder().user_agent("test-agent").build().unwrap()
    }

    #[tokio::test]
    async fn sends_agent_and_accept_headers() {
        let server = MockServer::start_async().await;
        let page = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/agents/jane")
                    .header("accept", ACCEPT_HTML)
                    .header("user-agent", "test-agent");
                then.status(200).body("<html><body>Jane</body></html>");
            })
            .await;

        let url = Url::parse(&server.url("/agents/jane")).unwrap();
        let html = fetch_page(&client(), &url, "127.0.0.1", &Settings::default())
            .await
            .unwrap();
        page.assert_async().await;
        assert!(html.contains("Jane"));
    }

    #[tokio::test]
    async fn truncates_large_bodies() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/big");
                then.status(200).body("a".repeat(5_000));
            })
            .await;

        let settings = Settings {
            max_html_bytes: 1_000,
            ..Settings::default()
        };
        let url = Url::parse(&server.url("/big")).unwrap();
        let html = fetch_page(&client(), &url, "127.0.0.1", &settings).await.unwrap();
        assert_eq!(html.len(), 1_000);
    }

    #[tokio::test]
    async fn truncation_respects_char_boundaries() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/wide");
                then.status(200).body("é".repeat(600));
            })
            .await;

        let settings = Settings {
            max_html_bytes: 999,
            ..Settings::default()
        };
        let url = Url::parse(&server.url("/wide")).unwrap();
        let html = fetch_page(&client(), &url, "127.0.0.1", &settings).await.unwrap();
        assert_eq!(html, "é".repeat(499));
    }

    #[tokio::test]
    async fn error_status_names_the_domain() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gone");
                then.status(404);
            })
            .await;

        let url = Url::parse(&server.url("/gone")).unwrap();
        let err = fetch_page(&client(), &url, "sunsetrealty.com", &Settings::default())
            .await
            .unwrap_err();
        assert!(matches!(&err, ScrubError::Unreachable { domain } if domain == "sunsetrealty.com"));
        assert_eq!(err.to_string(), "Unable to reach sunsetrealty.com");
    }

    #[tokio::test]
    async fn slow_page_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/slow");
                then.status(200).delay(Duration::from_secs(2)).body("late");
            })
            .await;

        let settings = Settings {
            fetch_timeout_ms: 200,
            ..Settings::default()
        };
        let url = Url::parse(&server.url("/slow")).unwrap();
        let err = fetch_page(&client(), &url, "127.0.0.1", &settings).await.unwrap_err();
        assert!(matches!(err, ScrubError::Timeout));
        assert_eq!(err.to_string(), "The website took too long to respond.");
    }
}
