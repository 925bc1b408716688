//! STEP_HTMLS_CLEANED section assembly.
//!
//! Repeat visits to a page collapse to a `DUPLICATE_URL` marker pointing at
//! the first step that captured it, and the whole section is held to a
//! character budget.

use std::borrow::Cow;
use std::collections::HashMap;

use pagectx_core::cache::AriaArtifact;
use pagectx_core::{CaptureMode, Snapshot};

/// Appended when the section budget runs out.
pub const STEP_HTMLS_TRUNCATION_MARKER: &str = "\n...[STEP_HTMLS_TRUNCATED]";

const ENTRY_SEPARATOR: &str = "\n\n";

/// Build the body of the STEP_HTMLS_CLEANED section.
///
/// The result is at most `budget` characters plus one truncation marker.
pub fn build_step_htmls(snapshots: &[Snapshot], budget: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    let mut first_seen: HashMap<&str, u32> = HashMap::new();

    for (i, snapshot) in snapshots.iter().enumerate() {
        let separator = if i == 0 { "" } else { ENTRY_SEPARATOR };
        let header = format!("{separator}{}\n", entry_header(snapshot));

        let duplicate_of = if snapshot.url.is_empty() {
            None
        } else {
            match first_seen.get(snapshot.url.as_str()) {
                Some(first) => Some(*first),
                None => {
                    first_seen.insert(snapshot.url.as_str(), snapshot.step_index);
                    None
                }
            }
        };

        let body: Cow<'_, str> = match duplicate_of {
            Some(first) => Cow::Owned(format!("DUPLICATE_URL: SAME_AS_STEP {first}")),
            None => snapshot_body(snapshot),
        };

        let header_chars = header.chars().count();
        if used + header_chars > budget {
            out.push_str(STEP_HTMLS_TRUNCATION_MARKER);
            tracing::debug!(step = snapshot.step_index, budget, "step snapshots truncated before entry header");
            break;
        }
        out.push_str(&header);
        used += header_chars;

        let body_chars = body.chars().count();
        if used + body_chars > budget {
            out.extend(body.chars().take(budget - used));
            out.push_str(STEP_HTMLS_TRUNCATION_MARKER);
            tracing::debug!(step = snapshot.step_index, budget, "step snapshots truncated inside entry body");
            break;
        }
        out.push_str(&body);
        used += body_chars;
    }

    out
}

fn entry_header(snapshot: &Snapshot) -> String {
    let entry = if snapshot.entry_action.trim().is_empty() { "(none)" } else { snapshot.entry_action.trim() };
    format!("[Step {}] URL: {} | Entry: {}", snapshot.step_index, snapshot.url, entry)
}

/// ARIA captures contribute their outline text; the tree is the fallback.
fn snapshot_body(snapshot: &Snapshot) -> Cow<'_, str> {
    match snapshot.capture_mode {
        CaptureMode::RawHtml => Cow::Borrowed(snapshot.compacted_markup.as_str()),
        CaptureMode::AriaSnapshot => {
            let artifact = AriaArtifact::parse(&snapshot.compacted_markup);
            if !artifact.aria_snapshot.trim().is_empty() {
                Cow::Owned(artifact.aria_snapshot)
            } else {
                Cow::Owned(artifact.a11y_tree.map(|tree| tree.to_string()).unwrap_or_default())
            }
        }
    }
}
