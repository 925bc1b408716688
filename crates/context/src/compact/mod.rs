//! Markup compaction for model context.
//!
//! Turns a full page into the inner markup of its content root while keeping
//! every signal a generated script could use to locate an element (ids,
//! classes, roles, ARIA and test attributes).
//!
//! ### Stages
//! 1. Drop noise elements: scripts, styles, head content, injected overlay
//!    widgets and anything loaded from a browser-extension URL.
//! 2. Drop comments.
//! 3. Filter attributes down to locator attributes.
//! 4. Truncate long text nodes.
//! 5. Prune empty elements bottom-up.
//! 6. Serialize without indentation and collapse whitespace.
//!
//! Compaction never fails and `compact(compact(x)) == compact(x)`.

mod tree;

use std::sync::LazyLock;

use pagectx_core::AppConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};

use tree::{Element, Node};

/// Appended to anything the compactor shortens.
pub const TRUNCATION_MARKER: &str = "...[truncated]";

/// Characters of a long data URI kept before the marker.
const DATA_URI_PREFIX_CHARS: usize = 50;

const NOISE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "meta", "link", "base", "head"];

/// Custom elements injected by translation and writing-assistant extensions.
const OVERLAY_ELEMENT_PREFIXES: &[&str] =
    &["immersive-translate", "grammarly-", "deepl-", "monica-extension", "sider-extension", "quillbot-"];

/// id / class prefixes of injected overlay containers.
const OVERLAY_MARKERS: &[&str] = &[
    "immersive-translate",
    "grammarly-",
    "deepl-translator",
    "monica-extension",
    "monica-ai-",
    "sider-extension",
    "sider-ai-",
];

/// Document structure elements, never treated as overlays.
const STRUCTURE_ELEMENTS: &[&str] = &["html", "body"];

const EXTENSION_SCHEMES: &[&str] = &[
    "chrome-extension:",
    "moz-extension:",
    "safari-extension:",
    "safari-web-extension:",
    "ms-browser-extension:",
    "edge-extension:",
];

/// Locator attributes kept on every element, in output order.
const KEPT_ATTRIBUTES: &[&str] = &[
    "id",
    "class",
    "name",
    "type",
    "value",
    "placeholder",
    "href",
    "src",
    "action",
    "method",
    "role",
    "title",
    "alt",
    "target",
    "for",
];

const REFERENCE_ATTRIBUTES: &[&str] = &["href", "src"];

/// Kept even when they end up with no attributes, children or text.
const MEANINGFUL_EMPTY_ELEMENTS: &[&str] = &["img", "input", "br", "hr", "textarea", "button", "select", "iframe"];

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\n\r\x0B\x0C]+").expect("invalid whitespace regex"));

/// Thresholds used by the compactor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactConfig {
    /// Text nodes longer than this are cut (default: 500).
    pub max_text_chars: usize,
    /// `data-*` / `test-*` values longer than this are dropped (default: 200).
    pub max_data_attr_chars: usize,
    /// `data:` URIs in `href`/`src` longer than this are shortened (default: 100).
    pub max_data_uri_chars: usize,
}

impl Default for CompactConfig {
    fn default() -> Self {
        Self { max_text_chars: 500, max_data_attr_chars: 200, max_data_uri_chars: 100 }
    }
}

impl From<&AppConfig> for CompactConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_text_chars: config.max_text_chars,
            max_data_attr_chars: config.max_data_attr_chars,
            max_data_uri_chars: config.max_data_uri_chars,
        }
    }
}

/// Counters collected during one compaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CompactStats {
    pub input_chars: usize,
    pub output_chars: usize,
    pub removed_elements: usize,
    pub removed_comments: usize,
    pub removed_attributes: usize,
    pub truncated_values: usize,
    pub truncated_texts: usize,
    pub pruned_empty: usize,
}

/// Markup compactor.
#[derive(Debug, Clone, Default)]
pub struct Compactor {
    config: CompactConfig,
}

impl Compactor {
    pub fn new(config: CompactConfig) -> Self {
        Self { config }
    }

    /// Compact a full document into the inner markup of its content root.
    pub fn compact(&self, markup: &str) -> String {
        self.compact_with_stats(markup).0
    }

    /// Compact and report what was removed.
    pub fn compact_with_stats(&self, markup: &str) -> (String, CompactStats) {
        let mut stats = CompactStats { input_chars: markup.chars().count(), ..Default::default() };
        if markup.trim().is_empty() {
            return (String::new(), stats);
        }

        let mut html = tree::parse_document(markup);

        strip_noise(&mut html, &mut stats);
        strip_comments(&mut html, &mut stats);
        html.merge_text_nodes();

        let mut root = content_root(html);
        self.filter_attributes(&mut root, &mut stats);
        self.truncate_texts(&mut root, &mut stats);
        prune_empty(&mut root, &mut stats);
        root.merge_text_nodes();
        self.truncate_texts(&mut root, &mut stats);

        let compacted = collapse_whitespace(&root.inner_html());
        stats.output_chars = compacted.chars().count();

        tracing::debug!(
            input_chars = stats.input_chars,
            output_chars = stats.output_chars,
            removed_elements = stats.removed_elements,
            removed_attributes = stats.removed_attributes,
            pruned_empty = stats.pruned_empty,
            "compacted markup"
        );

        (compacted, stats)
    }

    fn filter_attributes(&self, el: &mut Element, stats: &mut CompactStats) {
        let before = el.attrs.len();
        let mut kept: Vec<(AttrRank, String, String)> = Vec::with_capacity(before);

        for (name, value) in el.attrs.drain(..) {
            let Some(rank) = attribute_rank(&name) else {
                continue;
            };
            let value = WHITESPACE_RUN.replace_all(&value, " ").into_owned();
            let value = match rank {
                AttrRank::Data(_) if value.chars().count() > self.config.max_data_attr_chars => continue,
                AttrRank::Kept(_) if REFERENCE_ATTRIBUTES.contains(&name.as_str()) => {
                    match shorten_data_uri(&value, self.config.max_data_uri_chars) {
                        Some(shortened) => {
                            stats.truncated_values += 1;
                            shortened
                        }
                        None => value,
                    }
                }
                _ => value,
            };
            kept.push((rank, name, value));
        }

        kept.sort_by(|a, b| a.0.cmp(&b.0));
        stats.removed_attributes += before - kept.len();
        el.attrs = kept.into_iter().map(|(_, name, value)| (name, value)).collect();

        for child in &mut el.children {
            if let Node::Element(child) = child {
                self.filter_attributes(child, stats);
            }
        }
    }

    fn truncate_texts(&self, el: &mut Element, stats: &mut CompactStats) {
        for child in &mut el.children {
            match child {
                Node::Text(text) => {
                    if let Some(cut) = truncate_text(text, self.config.max_text_chars) {
                        stats.truncated_texts += 1;
                        *text = cut;
                    } else {
                        *text = WHITESPACE_RUN.replace_all(text, " ").into_owned();
                    }
                }
                Node::Element(child) => self.truncate_texts(child, stats),
                Node::Comment(_) => {}
            }
        }
    }
}

/// Compact with default thresholds.
pub fn compact(markup: &str) -> String {
    Compactor::default().compact(markup)
}

/// Ordering group of a kept attribute.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum AttrRank {
    Kept(usize),
    Aria(String),
    Data(String),
}

fn attribute_rank(name: &str) -> Option<AttrRank> {
    if let Some(idx) = KEPT_ATTRIBUTES.iter().position(|kept| *kept == name) {
        Some(AttrRank::Kept(idx))
    } else if name.starts_with("aria-") {
        Some(AttrRank::Aria(name.to_string()))
    } else if name.starts_with("data-") || name.starts_with("test-") {
        Some(AttrRank::Data(name.to_string()))
    } else {
        None
    }
}

fn shorten_data_uri(value: &str, max_chars: usize) -> Option<String> {
    let trimmed = value.trim_start();
    let is_data_uri = trimmed.get(..5).is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"));
    if !is_data_uri || value.chars().count() <= max_chars {
        return None;
    }
    let prefix: String = trimmed.chars().take(DATA_URI_PREFIX_CHARS).collect();
    Some(format!("{prefix}{TRUNCATION_MARKER}"))
}

/// Collapsed and cut text, or `None` when the text fits (or was already cut).
fn truncate_text(text: &str, max_chars: usize) -> Option<String> {
    let collapsed = WHITESPACE_RUN.replace_all(text, " ");
    if let Some(head) = collapsed.strip_suffix(TRUNCATION_MARKER)
        && head.chars().count() <= max_chars
    {
        return None;
    }
    if collapsed.chars().count() <= max_chars {
        return None;
    }
    let head: String = collapsed.chars().take(max_chars).collect();
    Some(format!("{head}{TRUNCATION_MARKER}"))
}

fn is_noise(el: &Element) -> bool {
    let name = el.name.as_str();
    if NOISE_ELEMENTS.contains(&name) || OVERLAY_ELEMENT_PREFIXES.iter().any(|p| name.starts_with(p)) {
        return true;
    }

    if !STRUCTURE_ELEMENTS.contains(&name) {
        let marked = |value: &str| OVERLAY_MARKERS.iter().any(|m| value.starts_with(m));
        if el.attr("id").is_some_and(marked) || el.attr("class").is_some_and(|c| c.split_whitespace().any(marked)) {
            return true;
        }
    }

    REFERENCE_ATTRIBUTES.iter().filter_map(|attr| el.attr(attr)).any(|value| {
        let value = value.trim_start().to_ascii_lowercase();
        EXTENSION_SCHEMES.iter().any(|scheme| value.starts_with(scheme))
    })
}

fn strip_noise(el: &mut Element, stats: &mut CompactStats) {
    el.children.retain(|child| match child {
        Node::Element(child) if is_noise(child) => {
            stats.removed_elements += 1;
            false
        }
        _ => true,
    });
    for child in &mut el.children {
        if let Node::Element(child) = child {
            strip_noise(child, stats);
        }
    }
}

fn strip_comments(el: &mut Element, stats: &mut CompactStats) {
    el.children.retain(|child| {
        let comment = matches!(child, Node::Comment(_));
        if comment {
            stats.removed_comments += 1;
        }
        !comment
    });
    for child in &mut el.children {
        if let Node::Element(child) = child {
            strip_comments(child, stats);
        }
    }
}

/// `<body>`, else `<html>` itself (framesets, fragments).
fn content_root(mut html: Element) -> Element {
    html.take_child("body").unwrap_or(html)
}

fn prune_empty(el: &mut Element, stats: &mut CompactStats) {
    for child in &mut el.children {
        if let Node::Element(child) = child {
            prune_empty(child, stats);
        }
    }
    el.children.retain(|child| match child {
        Node::Element(child) if is_prunable(child) => {
            stats.pruned_empty += 1;
            false
        }
        _ => true,
    });
}

fn is_prunable(el: &Element) -> bool {
    !MEANINGFUL_EMPTY_ELEMENTS.contains(&el.name.as_str())
        && el.attrs.is_empty()
        && !el.has_child_element()
        && !el.has_visible_text()
}

fn collapse_whitespace(markup: &str) -> String {
    WHITESPACE_RUN.replace_all(markup, " ").trim().to_string()
}
