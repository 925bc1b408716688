//! URL normalization and free-text URL harvesting.
//!
//! Snapshots are keyed on query-stripped URLs, so every component that
//! compares pages goes through [`normalize_url`].

use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};

static URL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://[^\s/?#]+\S*$").expect("invalid url shape regex"));

static URL_IN_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)https?://[^\s<>"'，。；、）)\]]+"#).expect("invalid url regex"));

static LABELED_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?P<label>[^\n:：=,，;；。]{1,60}?)[ \t]*(?:->|[:：=])[ \t]*(?P<url>https?://[^\s<>"'，。；、）)\]]+)"#,
    )
    .expect("invalid labeled url regex")
});

/// Phrasings meaning "everything happens on one page, no separate entry".
const SAME_PAGE_PHRASES: &[&str] = &[
    "same page",
    "on this page",
    "on the current page",
    "current page only",
    "this page only",
    "single page",
    "stay on the page",
    "stay on this page",
    "without navigating",
    "no navigation",
    "no need to navigate",
    "当前页面",
    "本页面",
    "同一页面",
    "同一个页面",
    "无需跳转",
    "不需要跳转",
    "不用跳转",
];

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '"'];

/// Whether the value structurally looks like an http(s) URL.
pub fn looks_like_url(value: &str) -> bool {
    URL_SHAPE.is_match(value.trim())
}

/// Strip the query string from URL-shaped values; anything else is returned unchanged.
///
/// The fragment goes with the query when both are present, matching how
/// snapshots were keyed historically.
pub fn normalize_url(value: &str) -> String {
    let trimmed = value.trim();
    if !looks_like_url(trimmed) {
        return value.to_string();
    }
    match trimmed.split_once('?') {
        Some((base, _)) => base.to_string(),
        None => trimmed.to_string(),
    }
}

/// The URL stored on a snapshot: normalized when URL-shaped, empty otherwise.
pub fn snapshot_url(value: &str) -> String {
    if looks_like_url(value) { normalize_url(value) } else { String::new() }
}

/// First http(s) URL mentioned in free text.
pub fn extract_first_url(text: &str) -> Option<String> {
    URL_IN_TEXT.find_iter(text).find_map(|m| clean_candidate(m.as_str()))
}

/// Label → URL pairs in the order the user wrote them.
///
/// Serializes as a JSON object with keys in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabeledUrls {
    entries: Vec<(String, String)>,
}

impl LabeledUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `label` to `url`. A known label keeps its position and takes the new URL.
    pub fn insert(&mut self, label: impl Into<String>, url: impl Into<String>) {
        let label = label.into();
        let url = url.into();
        match self.entries.iter_mut().find(|(known, _)| *known == label) {
            Some((_, existing)) => *existing = url,
            None => self.entries.push((label, url)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(known, _)| known == label)
            .map(|(_, url)| url.as_str())
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.entries.iter().any(|(_, known)| known == url)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(label, url)| (label.as_str(), url.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for LabeledUrls {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Label → URL pairs written as `label: url`, `label：url`, `label = url` or `label -> url`.
///
/// Later pairs with an already-seen label replace the earlier URL.
pub fn extract_labeled_urls(text: &str) -> LabeledUrls {
    let mut labeled = LabeledUrls::new();
    for caps in LABELED_URL.captures_iter(text) {
        let label = caps["label"]
            .trim()
            .trim_start_matches(['-', '*', '•', '>'])
            .trim();
        if label.is_empty() || label.contains("//") {
            continue;
        }
        if let Some(url) = clean_candidate(&caps["url"]) {
            labeled.insert(label, url);
        }
    }
    labeled
}

/// Merge hint pairs into the instruction pairs, skipping hint URLs already present.
pub fn merge_labeled_urls(mut base: LabeledUrls, extra: LabeledUrls) -> LabeledUrls {
    for (label, url) in extra.entries {
        if !base.contains_url(&url) {
            base.insert(label, url);
        }
    }
    base
}

/// Whether the text asks for an operation confined to the current page.
pub fn is_same_page_operation(text: &str) -> bool {
    let lowered = text.to_lowercase();
    SAME_PAGE_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

fn clean_candidate(candidate: &str) -> Option<String> {
    let trimmed = candidate.trim_end_matches(TRAILING_PUNCTUATION);
    match url::Url::parse(trimmed) {
        Ok(parsed) if parsed.host_str().is_some() => Some(trimmed.to_string()),
        _ => None,
    }
}
