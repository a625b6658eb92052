use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use url::Url;

use crate::html::{attr, meta_content, PageDocument};

static IMAGE_EXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(?:png|jpe?g|webp|gif|avif|bmp|svg)(?:\?|$)").unwrap());
static IMAGE_FORMAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[?&](?:fm|format|image_format)=(?:png|jpe?g|webp|gif|avif|bmp|svg)\b").unwrap()
});
static IMAGE_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)/(?:image|images|img|photo|photos|avatar|media)\b").unwrap()
});
static ICON_SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:16|24|32|48|64|96|128)x(?:16|24|32|48|64|96|128)\b").unwrap()
});
static IMG_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<img\b[^>]*>").unwrap());
static ANY_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<[a-z][a-z0-9]*\b[^>]*>").unwrap());
static STYLE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)url\(\s*['"]?([^'")]+?)['"]?\s*\)"#).unwrap());

pub const META_IMAGE_KEYS: &[&str] = &[
    "og:image",
    "og:image:url",
    "twitter:image",
    "twitter:image:src",
    "profile:image",
];
const IMG_SRC_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src", "data-original"];
const IMG_SRCSET_ATTRS: &[&str] = &["srcset", "data-srcset"];
const BACKGROUND_ATTRS: &[&str] = &["data-bg", "data-background", "data-background-image", "data-lazy-bg"];

pub const HEADSHOT_KEYWORDS: &[&str] = &["headshot", "portrait", "profile", "agent", "team", "staff"];

pub struct PhotoWeight {
    pub keywords: &'static [&'static str],
    pub score: i32,
}

/// Keyword weights applied to every candidate URL; each row counts once.
pub const PHOTO_WEIGHTS: &[PhotoWeight] = &[
    PhotoWeight { keywords: HEADSHOT_KEYWORDS, score: 5 },
    PhotoWeight { keywords: &["photo", "image", "media", "cdn"], score: 2 },
    PhotoWeight { keywords: &["logo", "icon", "favicon", "sprite", "placeholder"], score: -6 },
    PhotoWeight { keywords: &["banner", "header", "footer", "background", "hero"], score: -3 },
];
pub const ICON_SIZE_PENALTY: i32 = -2;
pub const MAX_PHOTO_CANDIDATES: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredCandidate {
    pub url: String,
    pub score: i32,
}

pub fn score_photo(url: &str) -> i32 {
    let lowered = url.to_lowercase();
    let keyword_score: i32 = PHOTO_WEIGHTS
        .iter()
        .filter(|w| w.keywords.iter().any(|k| lowered.contains(k)))
        .map(|w| w.score)
        .sum();
    if ICON_SIZE_RE.is_match(url) {
        keyword_score + ICON_SIZE_PENALTY
    } else {
        keyword_score
    }
}

pub fn is_likely_image_url(url: &str) -> bool {
    IMAGE_EXT_RE.is_match(url) || IMAGE_FORMAT_RE.is_match(url) || IMAGE_PATH_RE.is_match(url)
}

fn is_headshot_url(url: &str) -> bool {
    let lowered = url.to_lowercase();
    HEADSHOT_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Resolve against the page, dropping the fragment. Only http(s) survives.
pub fn resolve_url(raw: &str, base: &Url) -> Option<String> {
    let mut url = base.join(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

/// First URL of every `srcset` entry.
pub fn parse_srcset(value: &str) -> Vec<&str> {
    value
        .split(',')
        .filter_map(|entry| entry.split_whitespace().next())
        .collect()
}

/// Raw image references in source order: meta images, `<img>` sources,
/// then background images set through attributes or inline styles.
fn raw_sources(doc: &PageDocument) -> Vec<String> {
    let mut sources: Vec<String> = META_IMAGE_KEYS
        .iter()
        .filter_map(|key| meta_content(&doc.html, &[*key]))
        .collect();

    for m in IMG_TAG_RE.find_iter(&doc.body_html) {
        let tag = m.as_str();
        sources.extend(IMG_SRC_ATTRS.iter().filter_map(|a| attr(tag, a)));
        for set in IMG_SRCSET_ATTRS.iter().filter_map(|a| attr(tag, a)) {
            sources.extend(parse_srcset(&set).into_iter().map(String::from));
        }
    }

    // Site builders often render headshots as CSS backgrounds on divs.
    for m in ANY_TAG_RE.find_iter(&doc.body_html) {
        let tag = m.as_str();
        sources.extend(BACKGROUND_ATTRS.iter().filter_map(|a| attr(tag, a)));
        if let Some(style) = attr(tag, "style") {
            sources.extend(
                STYLE_URL_RE
                    .captures_iter(&style)
                    .map(|c| c[1].trim().to_string())
                    .filter(|u| !u.is_empty()),
            );
        }
    }

    sources
}

/// Collect, dedupe and rank photo candidates; the best come first and
/// at most [`MAX_PHOTO_CANDIDATES`] are kept.
pub fn collect_candidates(doc: &PageDocument, base: &Url) -> Vec<ScoredCandidate> {
    let urls = raw_sources(doc)
        .iter()
        .filter_map(|raw| resolve_url(raw, base))
        .filter(|url| is_likely_image_url(url))
        .unique()
        .collect();
    rank_candidates(urls)
}

pub fn rank_candidates(urls: Vec<String>) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = urls
        .into_iter()
        .map(|url| ScoredCandidate {
            score: score_photo(&url),
            url,
        })
        .collect();
    scored.sort_by_key(|c| Reverse(c.score));
    scored.truncate(MAX_PHOTO_CANDIDATES);
    scored
}

pub fn without_excluded(ranked: &[ScoredCandidate], excluded: &HashSet<String>) -> Vec<String> {
    ranked
        .iter()
        .filter(|c| !excluded.contains(&c.url))
        .map(|c| c.url.clone())
        .collect()
}

pub fn pick_headshot(candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .find(|url| is_headshot_url(url))
        .or_else(|| candidates.first())
        .cloned()
}
