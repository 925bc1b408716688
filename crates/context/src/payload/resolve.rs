//! Current-page URL resolution for code generation payloads.
//!
//! Snapshots carry query-stripped URLs. The payload's notion of "current
//! page" has to agree with that, or the model sees one page as two.

use pagectx_core::Snapshot;
use pagectx_core::urls::{looks_like_url, normalize_url};

const BLANK_PAGE: &str = "about:blank";

/// Resolve the URL reported by the driver against the snapshots of this turn.
pub fn resolve_current_url(driver_url: &str, snapshots: &[Snapshot]) -> String {
    let driver = driver_url.trim();
    let first_snapshot_url = || {
        snapshots
            .iter()
            .map(|s| s.url.as_str())
            .find(|url| looks_like_url(url))
            .map(str::to_string)
    };

    if driver.is_empty() || driver.eq_ignore_ascii_case(BLANK_PAGE) {
        return first_snapshot_url().unwrap_or_default();
    }

    let stripped = normalize_url(driver);
    let known = snapshots.iter().any(|s| {
        let url = normalize_url(&s.url);
        !url.is_empty() && (stripped.starts_with(&url) || url.starts_with(&stripped))
    });

    if known { stripped } else { first_snapshot_url().unwrap_or(stripped) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagectx_core::{CaptureMode, Snapshot};

    fn snap(step: u32, url: &str) -> Snapshot {
        Snapshot {
            step_index: step,
            url: url.to_string(),
            entry_action: String::new(),
            capture_mode: CaptureMode::RawHtml,
            cache_key: String::new(),
            compacted_markup: "<p>x</p>".to_string(),
        }
    }

    #[test]
    fn test_blank_driver_url_uses_first_snapshot() {
        let snapshots = [snap(0, ""), snap(1, "https://a.com/list")];
        assert_eq!(resolve_current_url("about:blank", &snapshots), "https://a.com/list");
        assert_eq!(resolve_current_url("  ", &snapshots), "https://a.com/list");
    }

    #[test]
    fn test_blank_driver_url_without_snapshots() {
        assert_eq!(resolve_current_url("", &[]), "");
    }

    #[test]
    fn test_matching_snapshot_keeps_stripped_driver_url() {
        let snapshots = [snap(0, "https://a.com/list")];
        assert_eq!(resolve_current_url("https://a.com/list?page=2", &snapshots), "https://a.com/list");
        assert_eq!(resolve_current_url("https://a.com/list/item/3?x=1", &snapshots), "https://a.com/list/item/3");
    }

    #[test]
    fn test_snapshot_longer_than_driver_url_matches() {
        let snapshots = [snap(0, "https://a.com/list/detail")];
        assert_eq!(resolve_current_url("https://a.com/list", &snapshots), "https://a.com/list");
    }

    #[test]
    fn test_unknown_page_prefers_snapshot_url() {
        let snapshots = [snap(0, "https://a.com/list")];
        assert_eq!(resolve_current_url("https://other.com/x?y=1", &snapshots), "https://a.com/list");
    }

    #[test]
    fn test_unknown_page_without_snapshots() {
        assert_eq!(resolve_current_url("https://other.com/x?y=1", &[]), "https://other.com/x");
    }
}
