use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

pub const USER_AGENT: &str = "InspectOS-Agent-Scrub/1.0";
pub const FETCH_TIMEOUT_MS: u64 = 10_000;
pub const LOOKUP_TIMEOUT_MS: u64 = 4_000;
pub const MAX_HTML_BYTES: usize = 1_000_000;

const PLACES_SEARCH_URL: &str = "https://places.googleapis.com/v1/places:searchText";
const LOGO_SEARCH_URL: &str = "https://api.logo.dev/search";
const LOGO_IMAGE_BASE: &str = "https://img.logo.dev";

/// Runtime configuration, handed to [`crate::Scrubber::new`].
///
/// Loaded from built-in defaults, then an optional `scrub.toml`, then
/// `SCRUB_*` environment variables (`SCRUB_PLACES__API_KEY`,
/// `SCRUB_LOGO__SECRET_KEY`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub user_agent: String,
    pub fetch_timeout_ms: u64,
    pub lookup_timeout_ms: u64,
    pub max_html_bytes: usize,
    pub places: PlacesSettings,
    pub logo: LogoSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesSettings {
    pub api_key: Option<String>,
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoSettings {
    pub secret_key: Option<String>,
    pub publishable_key: Option<String>,
    pub search_endpoint: String,
    pub image_base: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            user_agent: USER_AGENT.to_string(),
            fetch_timeout_ms: FETCH_TIMEOUT_MS,
            lookup_timeout_ms: LOOKUP_TIMEOUT_MS,
            max_html_bytes: MAX_HTML_BYTES,
            places: PlacesSettings {
                api_key: None,
                endpoint: PLACES_SEARCH_URL.to_string(),
            },
            logo: LogoSettings {
                secret_key: None,
                publishable_key: None,
                search_endpoint: LOGO_SEARCH_URL.to_string(),
                image_base: LOGO_IMAGE_BASE.to_string(),
            },
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name("scrub").required(false))
            .add_source(
                Environment::with_prefix("SCRUB")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

impl PlacesSettings {
    pub fn api_key(&self) -> Option<&str> {
        non_blank(self.api_key.as_deref())
    }
}

impl LogoSettings {
    pub fn secret_key(&self) -> Option<&str> {
        non_blank(self.secret_key.as_deref())
    }

    pub fn publishable_key(&self) -> Option<&str> {
        non_blank(self.publishable_key.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
