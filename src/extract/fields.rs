use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

use crate::html::collapse_whitespace;

static PAGE_EXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(?:html|htm|php)$").unwrap());
static TITLE_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s-]+").unwrap());
static MAILTO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)mailto:([A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,})").unwrap()
});
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}").unwrap());
static TEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)tel:([+\d][0-9().\-\s]{7,})").unwrap());
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[+\d][0-9().\-\s]{7,}").unwrap());
static LICENSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\blicen(?:se|sed)\b\s*(?:#|no\.?|number)?\s*[:#-]?\s*([A-Z0-9][A-Z0-9-]{3,})")
        .unwrap()
});

/// Tried in order; the first separator present wins.
pub const NAME_SEPARATORS: &[&str] = &[" — ", " – ", " | ", " • ", " - "];

pub const NAME_META_KEYS: &[&str] = &["profile:first_name", "og:title", "twitter:title"];
pub const AGENCY_META_KEYS: &[&str] = &["og:site_name", "application-name"];

const ROLE_RULES: &[(&[&str], &str)] = &[
    (&["realtor", "real estate agent", "listing agent"], "Realtor"),
    (&["broker", "associate broker"], "Broker"),
    (&["team lead", "team leader"], "Team Lead"),
];

const PHONE_MIN_DIGITS: usize = 10;
const PHONE_MAX_DIGITS: usize = 15;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameSplit {
    pub person: Option<String>,
    pub agency: Option<String>,
}

/// Split a display name like "Jane Doe — Sunset Realty" into person and
/// agency. Plain hyphens only count with spaces around them so that
/// hyphenated surnames survive.
pub fn split_person_and_agency(raw: Option<&str>) -> NameSplit {
    let Some(raw) = raw else {
        return NameSplit::default();
    };
    let cleaned = collapse_whitespace(raw);
    if cleaned.is_empty() {
        return NameSplit::default();
    }

    for separator in NAME_SEPARATORS {
        if !cleaned.contains(separator) {
            continue;
        }
        let mut parts = cleaned
            .split(separator)
            .map(str::trim)
            .filter(|p| !p.is_empty());
        let Some(head) = parts.next() else {
            continue;
        };
        let tail = parts.join(" ");
        return NameSplit {
            person: Some(head.to_string()),
            agency: (!tail.is_empty()).then_some(tail),
        };
    }

    NameSplit {
        person: Some(cleaned),
        agency: None,
    }
}

pub fn title_case(value: &str) -> String {
    TITLE_SPLIT_RE
        .split(value)
        .filter(|p| !p.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .join(" ")
}

/// "/agents/jane-doe.html" -> "Jane Doe".
pub fn name_from_path(path: &str) -> Option<String> {
    let last = path.split('/').filter(|s| !s.is_empty()).last()?;
    let stem = PAGE_EXT_RE.replace(last, "");
    if stem.chars().count() < 2 {
        return None;
    }
    let name = title_case(&stem);
    (!name.is_empty()).then_some(name)
}

/// "sunsetrealty.com" -> "Sunsetrealty".
pub fn agency_from_domain(domain: &str) -> Option<String> {
    let label = domain.split('.').next().unwrap_or_default();
    if label.is_empty() {
        return None;
    }
    Some(title_case(label))
}

pub fn extract_email(source: &str) -> Option<String> {
    MAILTO_RE
        .captures(source)
        .and_then(|c| c.get(1))
        .or_else(|| EMAIL_RE.find(source))
        .map(|m| m.as_str().to_lowercase())
}

pub fn extract_phone(source: &str) -> Option<String> {
    if let Some(tel) = TEL_RE.captures(source).and_then(|c| c.get(1)) {
        return Some(collapse_whitespace(tel.as_str()));
    }
    PHONE_RE
        .find_iter(source)
        .map(|m| m.as_str())
        .find(|candidate| {
            let digits = candidate.chars().filter(|c| c.is_ascii_digit()).count();
            (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits)
        })
        .map(collapse_whitespace)
}

pub fn extract_role(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    ROLE_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lowered.contains(n)))
        .map(|(_, label)| label.to_string())
}

/// License numbers in first-seen order. A token must carry at least one
/// digit, which keeps "Licensed Realtor" out.
pub fn extract_licenses(text: &str) -> Vec<String> {
    LICENSE_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim_end_matches('-').to_string())
        .filter(|token| token.len() >= 4 && token.chars().any(|c| c.is_ascii_digit()))
        .unique()
        .collect()
}
