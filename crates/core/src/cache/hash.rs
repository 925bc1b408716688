//! Content-addressed cache key generation.
//!
//! Current keys hash, newline-separated: the normalized URL, the entry
//! action, `CAPTURE_MODE=<mode>` and, for ARIA captures only,
//! `A11Y_INTERESTING_ONLY=<bool>`. Legacy keys hash `url + "\n" + action`.

use sha2::{Digest, Sha256};

use super::snapshots::CaptureMode;
use crate::urls::normalize_url;

/// Compute the current cache key for a page snapshot.
pub fn compute_cache_key(url: &str, entry_action: &str, mode: CaptureMode, interesting_only: bool) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_url(url).as_bytes());
    hasher.update(b"\n");
    hasher.update(entry_action.as_bytes());
    hasher.update(b"\n");
    hasher.update(format!("CAPTURE_MODE={}", mode.as_str()).as_bytes());
    if mode == CaptureMode::AriaSnapshot {
        hasher.update(b"\n");
        hasher.update(format!("A11Y_INTERESTING_ONLY={interesting_only}").as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Key shapes written before capture modes existed, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyKeyScheme {
    /// `url + "\n" + action` over the URL exactly as reported.
    RawUrl,
    /// `url + "\n" + action` over the query-stripped URL.
    NormalizedUrl,
}

impl LegacyKeyScheme {
    pub const LOOKUP_ORDER: [LegacyKeyScheme; 2] = [LegacyKeyScheme::RawUrl, LegacyKeyScheme::NormalizedUrl];

    /// Compute the legacy key for this scheme.
    pub fn key(self, url: &str, entry_action: &str) -> String {
        match self {
            LegacyKeyScheme::RawUrl => legacy_key(url, entry_action),
            LegacyKeyScheme::NormalizedUrl => legacy_key(&normalize_url(url), entry_action),
        }
    }
}

fn legacy_key(url: &str, entry_action: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(b"\n");
    hasher.update(entry_action.as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether `key` has the shape of a key produced by this module.
pub fn is_valid_key(key: &str) -> bool {
    key.len() == 64 && key.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
