use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

use crate::html::{collapse_whitespace, decode_entities, strip_tags, PageDocument};

/// Longer spellings first so "Street" is never read as "St" + "reet".
const STREET_TYPES: &str = "street|st|avenue|ave|road|rd|boulevard|blvd|drive|dr|lane|ln|way|\
                            parkway|pkwy|court|ct|place|pl|terrace|ter|circle|cir|highway|hwy";
const CITY_STATE_ZIP: &str = r"([A-Za-z .'-]+),?\s*([A-Za-z]{2})\s*,?\s*(\d{5}(?:-\d{4})?)\b";

fn street_pattern(max_words: usize) -> String {
    format!(
        r"\d{{1,6}}\s+[A-Za-z0-9#.'-]+(?:\s+[A-Za-z0-9#.'-]+){{0,{max_words}}}\s+(?:{STREET_TYPES})\b\.?"
    )
}

static ADDRESS_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<address\b[^>]*>(.*?)</address\s*>").unwrap());
static LABELED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:address|office|location)\b[:\s-]+([A-Za-z0-9#.,\-\s]{12,120})").unwrap()
});
static TEXT_ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b({})\s+{CITY_STATE_ZIP}", street_pattern(7))).unwrap()
});
static FULL_ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b({})\s*,?\s*{CITY_STATE_ZIP}", street_pattern(6))).unwrap()
});
static STREET_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)\b{}", street_pattern(6))).unwrap());
static TRAILING_NOISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\b(?:hours?|phone|call|contact)\b.*$").unwrap());
static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:hours?|office|address|location)\b[:\s-]*").unwrap());
static ZIP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{5}(?:-\d{4})?\b").unwrap());
static STATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z]{2}$").unwrap());

fn assemble(caps: &Captures) -> String {
    format!(
        "{}, {}, {} {}",
        caps[1].trim(),
        caps[2].trim(),
        caps[3].to_uppercase(),
        caps[4].trim()
    )
}

/// Best raw address on the page: an `<address>` element, then a labeled
/// line, then any street+city+state+ZIP run in the text.
pub fn extract_address(doc: &PageDocument) -> Option<String> {
    let block = ADDRESS_BLOCK_RE
        .captures(&doc.body_html)
        .and_then(|c| c.get(1))
        .map(|m| collapse_whitespace(&decode_entities(&strip_tags(m.as_str()))))
        .filter(|a| !a.is_empty());
    if block.is_some() {
        return block;
    }

    if let Some(labeled) = LABELED_RE.captures(&doc.text).and_then(|c| c.get(1)) {
        let labeled = collapse_whitespace(labeled.as_str());
        if !labeled.is_empty() {
            return Some(labeled);
        }
    }

    TEXT_ADDRESS_RE.captures(&doc.text).map(|caps| assemble(&caps))
}

/// Canonicalize a loosely formatted address to "STREET, CITY, ST ZIP".
/// Falls back to the street alone, then to the cleaned input.
pub fn normalize_address(value: Option<&str>) -> Option<String> {
    let value = value?;
    let without_tail = TRAILING_NOISE_RE.replace(value, "");
    let cleaned = collapse_whitespace(&LABEL_RE.replace_all(&without_tail, ""));
    if cleaned.is_empty() {
        return None;
    }

    if let Some(caps) = FULL_ADDRESS_RE.captures(&cleaned) {
        return Some(assemble(&caps));
    }
    if let Some(street) = STREET_ONLY_RE.find(&cleaned) {
        return Some(street.as_str().trim().to_string());
    }
    Some(cleaned)
}

pub fn looks_like_street_address(value: &str) -> bool {
    STREET_ONLY_RE.is_match(value)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressParts {
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

/// Split a normalized address into form fields. Works from the end:
/// ZIP, then a two-letter state, then the city; anything left between
/// line 1 and the city becomes line 2.
pub fn parse_address_segments(address: Option<&str>) -> Option<AddressParts> {
    let mut remaining: Vec<String> = address?
        .lines()
        .flat_map(|line| line.split(','))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if remaining.is_empty() {
        return None;
    }
    let line1 = remaining.remove(0);

    let mut zip_code = None;
    if let Some(last) = remaining.last_mut() {
        if let Some(zip) = ZIP_RE.find(last) {
            zip_code = Some(zip.as_str().to_string());
            let rest = format!("{}{}", &last[..zip.start()], &last[zip.end()..]);
            let rest = rest.trim().to_string();
            if rest.is_empty() {
                remaining.pop();
            } else {
                *last = rest;
            }
        }
    }

    let mut state = None;
    if remaining.last().is_some_and(|t| STATE_RE.is_match(t)) {
        state = remaining.pop().map(|s| s.to_uppercase());
    }

    if state.is_none() {
        if let Some(last) = remaining.last_mut() {
            let mut words: Vec<&str> = last.split_whitespace().collect();
            if words.last().is_some_and(|w| STATE_RE.is_match(w)) {
                state = words.pop().map(str::to_uppercase);
                let rebuilt = words.join(" ");
                if rebuilt.is_empty() {
                    remaining.pop();
                } else {
                    *last = rebuilt;
                }
            }
        }
    }

    let city = remaining.pop();
    let line2 = (!remaining.is_empty()).then(|| remaining.join(", "));

    Some(AddressParts {
        address_line1: Some(line1),
        address_line2: line2,
        city,
        state,
        zip_code,
    })
}
