//! snapshot_get tool implementation.
//!
//! Looks up a cached snapshot by its identifying request, including
//! snapshots written under earlier key schemes.

use pagectx_core::cache::{KeySource, LegacyKeyScheme};
use pagectx_core::{CaptureMode, Error, Snapshot, SnapshotRequest};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{ToolState, json_result, run_blocking};

/// Parameters for the snapshot_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SnapshotGetParams {
    #[serde(default)]
    pub step_index: u32,
    pub url: String,
    #[serde(default)]
    pub entry_action: String,
    #[serde(default)]
    pub capture_mode: CaptureMode,
    #[serde(default)]
    pub interesting_only: bool,
    /// Also return the pre-compaction artifact.
    #[serde(default)]
    pub include_raw: bool,
}

/// Output from the snapshot_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SnapshotGetOutput {
    pub snapshot: Snapshot,
    /// `current`, `legacy_raw_url` or `legacy_normalized_url`.
    pub key_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

fn key_source_name(source: KeySource) -> &'static str {
    match source {
        KeySource::Current => "current",
        KeySource::Legacy(LegacyKeyScheme::RawUrl) => "legacy_raw_url",
        KeySource::Legacy(LegacyKeyScheme::NormalizedUrl) => "legacy_normalized_url",
    }
}

/// Implementation of the snapshot_get tool.
pub async fn get_impl(state: ToolState, params: SnapshotGetParams) -> Result<CallToolResult, McpError> {
    let request = SnapshotRequest::new(params.step_index, params.url, params.entry_action)
        .with_capture(params.capture_mode, params.interesting_only);
    let include_raw = params.include_raw;

    let output = run_blocking(move || {
        let (snapshot, source) = state
            .store
            .read_with_source(&request)
            .ok_or_else(|| Error::CacheMiss(request.cache_key()))?;
        let raw = if include_raw { state.store.read_raw(&request) } else { None };
        Ok(SnapshotGetOutput { snapshot, key_source: key_source_name(source).to_string(), raw })
    })
    .await?;

    json_result(&output)
}
