//! Snapshot types.
//!
//! A [`Snapshot`] is the unit of cached page state handed to the payload
//! assembler. It is immutable once built; the backend owns the bytes.

use serde::{Deserialize, Serialize};

use super::hash::compute_cache_key;
use crate::urls::snapshot_url;

/// How the page was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptureMode {
    /// Compacted HTML markup.
    #[default]
    RawHtml,
    /// JSON accessibility artifact, see [`AriaArtifact`].
    AriaSnapshot,
}

impl CaptureMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CaptureMode::RawHtml => "RAW_HTML",
            CaptureMode::AriaSnapshot => "ARIA_SNAPSHOT",
        }
    }
}

impl std::fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one capture of one logical page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SnapshotRequest {
    /// Agent step that produced (or wants) the snapshot.
    pub step_index: u32,
    /// Page URL as reported by the driver.
    pub url: String,
    /// How the page was reached; empty when unknown.
    #[serde(default)]
    pub entry_action: String,
    #[serde(default)]
    pub capture_mode: CaptureMode,
    /// Only meaningful for ARIA captures.
    #[serde(default)]
    pub interesting_only: bool,
}

impl SnapshotRequest {
    pub fn new(step_index: u32, url: impl Into<String>, entry_action: impl Into<String>) -> Self {
        Self { step_index, url: url.into(), entry_action: entry_action.into(), ..Default::default() }
    }

    pub fn with_capture(mut self, capture_mode: CaptureMode, interesting_only: bool) -> Self {
        self.capture_mode = capture_mode;
        self.interesting_only = interesting_only;
        self
    }

    /// Current-scheme cache key for this request.
    pub fn cache_key(&self) -> String {
        compute_cache_key(&self.url, &self.entry_action, self.capture_mode, self.interesting_only)
    }
}

/// A cached page snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Snapshot {
    pub step_index: u32,
    /// Query-stripped URL, empty when the source was not URL-shaped.
    pub url: String,
    pub entry_action: String,
    pub capture_mode: CaptureMode,
    pub cache_key: String,
    pub compacted_markup: String,
}

impl Snapshot {
    /// Build a snapshot for `request` around an already-resolved key.
    pub fn from_request(request: &SnapshotRequest, cache_key: String, compacted_markup: String) -> Self {
        Self {
            step_index: request.step_index,
            url: snapshot_url(&request.url),
            entry_action: request.entry_action.clone(),
            capture_mode: request.capture_mode,
            cache_key,
            compacted_markup,
        }
    }
}

/// Compacted artifact of an ARIA capture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AriaArtifact {
    /// Accessibility snapshot text (YAML-like outline).
    #[serde(default)]
    pub aria_snapshot: String,
    /// Auxiliary accessibility tree, when the driver produced one.
    #[serde(default)]
    pub a11y_tree: Option<serde_json::Value>,
}

impl AriaArtifact {
    /// Parse a stored artifact; non-JSON content is read as plain snapshot text.
    pub fn parse(artifact: &str) -> Self {
        match serde_json::from_str::<AriaArtifact>(artifact) {
            Ok(parsed) => parsed,
            Err(_) => Self { aria_snapshot: artifact.to_string(), a11y_tree: None },
        }
    }

    /// A capture with no text and no tree failed; it is not an empty page.
    pub fn is_usable(&self) -> bool {
        !self.aria_snapshot.trim().is_empty() || self.a11y_tree.as_ref().is_some_and(has_content)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn has_content(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Object(map) => !map.is_empty(),
        serde_json::Value::Array(items) => !items.is_empty(),
        serde_json::Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_capture_mode_serde() {
        assert_eq!(serde_json::to_string(&CaptureMode::AriaSnapshot).unwrap(), "\"ARIA_SNAPSHOT\"");
        let mode: CaptureMode = serde_json::from_str("\"RAW_HTML\"").unwrap();
        assert_eq!(mode, CaptureMode::RawHtml);
        assert_eq!(CaptureMode::default(), CaptureMode::RawHtml);
    }

    #[test]
    fn test_snapshot_from_request_normalizes_url() {
        let request = SnapshotRequest::new(2, "https://a.com/list?page=3", "click next");
        let snapshot = Snapshot::from_request(&request, request.cache_key(), "<div></div>".into());
        assert_eq!(snapshot.url, "https://a.com/list");
        assert_eq!(snapshot.step_index, 2);
        assert_eq!(snapshot.entry_action, "click next");
        assert_eq!(snapshot.cache_key.len(), 64);
    }

    #[test]
    fn test_snapshot_from_request_non_url() {
        let request = SnapshotRequest::new(0, "about:blank", "");
        let snapshot = Snapshot::from_request(&request, request.cache_key(), String::new());
        assert!(snapshot.url.is_empty());
    }

    #[test]
    fn test_request_default_mode() {
        let request: SnapshotRequest = serde_json::from_value(json!({"step_index": 1, "url": "https://a.com"})).unwrap();
        assert_eq!(request.capture_mode, CaptureMode::RawHtml);
        assert!(!request.interesting_only);
        assert!(request.entry_action.is_empty());
    }

    #[test]
    fn test_aria_artifact_usable() {
        let text_only = AriaArtifact::parse(r#"{"aria_snapshot": "- button \"Go\""}"#);
        assert!(text_only.is_usable());

        let tree_only = AriaArtifact::parse(r#"{"aria_snapshot": "", "a11y_tree": {"role": "WebArea"}}"#);
        assert!(tree_only.is_usable());

        let empty = AriaArtifact::parse(r#"{"aria_snapshot": "  ", "a11y_tree": null}"#);
        assert!(!empty.is_usable());

        let empty_tree = AriaArtifact::parse(r#"{"aria_snapshot": "", "a11y_tree": {}}"#);
        assert!(!empty_tree.is_usable());
    }

    #[test]
    fn test_aria_artifact_plain_text_fallback() {
        let artifact = AriaArtifact::parse("- heading \"Welcome\" [level=1]");
        assert_eq!(artifact.aria_snapshot, "- heading \"Welcome\" [level=1]");
        assert!(artifact.a11y_tree.is_none());
        assert!(artifact.is_usable());
    }
}
