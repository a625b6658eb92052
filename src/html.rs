use std::sync::LazyLock;

use regex::{Captures, Regex};

static NOISE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>").unwrap()
});
static BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*?)</body\s*>").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)&(?:#x([0-9a-f]+)|#([0-9]+)|(amp|quot|apos|nbsp|mdash|ndash|lt|gt));").unwrap()
});
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").unwrap());
static META_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<meta\b[^>]*>").unwrap());
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s([a-z0-9_:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

/// One fetched page, held only for the duration of a scrub.
#[derive(Debug, Clone)]
pub struct PageDocument {
    /// Whole document with `<script>`/`<style>` blocks removed.
    pub html: String,
    /// Inner `<body>` markup, or the whole cleaned document if there is none.
    pub body_html: String,
    /// Tag-free, entity-decoded, whitespace-collapsed body text.
    pub text: String,
}

impl PageDocument {
    pub fn parse(raw: &str) -> Self {
        let html = strip_noise(raw);
        let body_html = extract_body(&html).to_string();
        let text = collapse_whitespace(&decode_entities(&strip_tags(&body_html)));
        PageDocument {
            html,
            body_html,
            text,
        }
    }

    /// Markup and text together, for token scans that should see both
    /// link targets and rendered copy.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.html, self.text)
    }
}

pub fn strip_noise(html: &str) -> String {
    NOISE_RE.replace_all(html, " ").into_owned()
}

pub fn extract_body(html: &str) -> &str {
    BODY_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(html)
}

pub fn strip_tags(html: &str) -> String {
    TAG_RE.replace_all(html, " ").into_owned()
}

pub fn collapse_whitespace(value: &str) -> String {
    WS_RE.replace_all(value, " ").trim().to_string()
}

/// Decode the entity set profile pages actually use. Unknown named
/// entities pass through untouched; invalid code points decode to nothing.
pub fn decode_entities(value: &str) -> String {
    ENTITY_RE
        .replace_all(value, |caps: &Captures| {
            if let Some(hex) = caps.get(1) {
                return code_point(u32::from_str_radix(hex.as_str(), 16).ok());
            }
            if let Some(dec) = caps.get(2) {
                return code_point(dec.as_str().parse::<u32>().ok());
            }
            let named = caps.get(3).map(|m| m.as_str().to_ascii_lowercase());
            match named.as_deref() {
                Some("amp") => "&",
                Some("quot") => "\"",
                Some("apos") => "'",
                Some("nbsp") => " ",
                Some("mdash") => "—",
                Some("ndash") => "–",
                Some("lt") => "<",
                Some("gt") => ">",
                _ => "",
            }
            .to_string()
        })
        .trim()
        .to_string()
}

fn code_point(code: Option<u32>) -> String {
    code.and_then(char::from_u32)
        .map(String::from)
        .unwrap_or_default()
}

/// Value of the first attribute called `name` (case-insensitive) in a
/// single start tag, entity-decoded. Empty values count as missing.
pub fn attr(tag: &str, name: &str) -> Option<String> {
    ATTR_RE.captures_iter(tag).find_map(|caps| {
        if !caps[1].eq_ignore_ascii_case(name) {
            return None;
        }
        let raw = caps.get(2).or(caps.get(3)).or(caps.get(4))?.as_str();
        let value = decode_entities(raw);
        (!value.is_empty()).then_some(value)
    })
}

/// Content of the first `<meta name|property="key">` tag, trying `keys`
/// in priority order.
pub fn meta_content(html: &str, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        META_TAG_RE.find_iter(html).find_map(|m| {
            let tag = m.as_str();
            let matches_key = ["name", "property"]
                .iter()
                .any(|a| attr(tag, a).is_some_and(|v| v.eq_ignore_ascii_case(key)));
            if !matches_key {
                return None;
            }
            attr(tag, "content")
                .map(|c| collapse_whitespace(&c))
                .filter(|c| !c.is_empty())
        })
    })
}

pub fn title(html: &str) -> Option<String> {
    let raw = TITLE_RE.captures(html)?.get(1)?.as_str();
    let title = decode_entities(&collapse_whitespace(raw));
    (!title.is_empty()).then_some(title)
}
