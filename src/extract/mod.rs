pub mod address;
pub mod fields;
pub mod photos;

use tracing::debug;
use url::Url;

use crate::html::{meta_content, title, PageDocument};
use fields::{AGENCY_META_KEYS, NAME_META_KEYS};
use photos::ScoredCandidate;

/// Everything derivable from the page alone, before reconciliation.
#[derive(Debug, Clone, Default)]
pub struct PageFields {
    pub name: Option<String>,
    pub agency_name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub license_numbers: Vec<String>,
    pub scraped_address: Option<String>,
    pub photo_candidates: Vec<ScoredCandidate>,
}

pub fn extract_all(doc: &PageDocument, url: &Url, domain: &str) -> PageFields {
    let display_name = meta_content(&doc.html, NAME_META_KEYS)
        .or_else(|| title(&doc.html))
        .or_else(|| fields::name_from_path(url.path()));
    let split = fields::split_person_and_agency(display_name.as_deref());

    let agency_name = meta_content(&doc.html, AGENCY_META_KEYS)
        .or_else(|| fields::agency_from_domain(domain))
        .or(split.agency);

    let combined = doc.combined();
    let page = PageFields {
        name: split.person,
        agency_name,
        role: fields::extract_role(&doc.text),
        email: fields::extract_email(&combined),
        phone: fields::extract_phone(&combined),
        license_numbers: fields::extract_licenses(&doc.text),
        scraped_address: address::extract_address(doc),
        photo_candidates: photos::collect_candidates(doc, url),
    };

    debug!(
        %domain,
        name = ?page.name,
        agency = ?page.agency_name,
        photos = page.photo_candidates.len(),
        address = ?page.scraped_address,
        "Extracted page fields"
    );
    page
}
