//! snapshot_capture tool implementation.
//!
//! Compacts a freshly captured page and writes both artifacts to the
//! snapshot store. A failed write still returns the snapshot, flagged as
//! uncached, so the agent can carry on.

use pagectx_context::CompactStats;
use pagectx_core::cache::AriaArtifact;
use pagectx_core::{CaptureMode, Error, Snapshot, SnapshotRequest};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{ToolState, json_result, run_blocking};

/// Input parameters for the snapshot_capture tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SnapshotCaptureParams {
    /// Agent step that produced the capture.
    pub step_index: u32,

    /// Page URL as reported by the browser driver.
    pub url: String,

    /// How the page was reached (e.g. the click that led here).
    #[serde(default)]
    pub entry_action: String,

    /// `RAW_HTML` (default) or `ARIA_SNAPSHOT`.
    #[serde(default)]
    pub capture_mode: CaptureMode,

    /// Whether the ARIA tree was limited to interesting nodes.
    #[serde(default)]
    pub interesting_only: bool,

    /// Page markup, or the ARIA artifact (JSON or plain outline text).
    pub raw: String,
}

/// Output from the snapshot_capture tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SnapshotCaptureOutput {
    pub snapshot: Snapshot,
    /// False when persistence failed and the snapshot lives only in this response.
    pub cached: bool,
    /// Compaction counters, RAW_HTML captures only.
    pub stats: Option<CompactStats>,
}

/// Implementation of the snapshot_capture tool.
pub async fn capture_impl(state: ToolState, params: SnapshotCaptureParams) -> Result<CallToolResult, McpError> {
    if params.raw.trim().is_empty() {
        return Err(Error::InvalidInput("raw capture cannot be empty".into()).into());
    }

    let request = SnapshotRequest::new(params.step_index, params.url, params.entry_action)
        .with_capture(params.capture_mode, params.interesting_only);
    let raw = params.raw;

    let output = run_blocking(move || {
        let (compacted, stats) = match request.capture_mode {
            CaptureMode::RawHtml => {
                let (compacted, stats) = state.compactor.compact_with_stats(&raw);
                (compacted, Some(stats))
            }
            CaptureMode::AriaSnapshot => {
                let artifact = AriaArtifact::parse(&raw);
                if !artifact.is_usable() {
                    return Err(Error::InvalidInput("ARIA capture has no snapshot text and no tree".into()).into());
                }
                (artifact.to_json(), None)
            }
        };

        let output = match state.store.write(&request, &raw, &compacted) {
            Some(snapshot) => SnapshotCaptureOutput { snapshot, cached: true, stats },
            None => SnapshotCaptureOutput {
                snapshot: Snapshot::from_request(&request, request.cache_key(), compacted),
                cached: false,
                stats,
            },
        };
        Ok(output)
    })
    .await?;

    json_result(&output)
}
