use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::extract::address::AddressParts;
use crate::reconcile::{LogoTrace, PlacesTrace};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrubRequest {
    #[serde(default)]
    pub url: String,
    /// Photo URLs the caller already rejected.
    #[serde(default)]
    pub exclude_photos: HashSet<String>,
    #[serde(default)]
    pub debug: bool,
}

impl ScrubRequest {
    pub fn new(url: impl Into<String>) -> Self {
        ScrubRequest {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn exclude<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_photos.extend(urls.into_iter().map(Into::into));
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedProfile {
    pub url: String,
    pub domain: String,
    pub name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub license_numbers: Vec<String>,
    pub photo_url: Option<String>,
    pub photo_candidates: Vec<String>,
    pub logo_url: Option<String>,
    pub agency_name: Option<String>,
    pub agency_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency_address_parts: Option<AddressParts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugTrace>,
}

/// Intermediate decisions, returned only on request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugTrace {
    pub places: PlacesTrace,
    pub scraped_agency_address: Option<String>,
    pub normalized_agency_address: Option<String>,
    pub logo: LogoTrace,
}
