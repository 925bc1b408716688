//! payload_build tool implementation.
//!
//! Resolves the referenced step snapshots from the store and assembles the
//! prompt payload for one phase of the agent loop.

use pagectx_context::{PayloadInput, PayloadMode};
use pagectx_core::{Snapshot, SnapshotRequest};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{ToolState, json_result, run_blocking};

/// Input parameters for the payload_build tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PayloadBuildParams {
    /// `PLAN_ONLY`, `PLAN_ENTRY`, `PLAN_REFINE`, `CODEGEN` or `REFINE_CODE`.
    pub mode: PayloadMode,

    /// URL currently reported by the browser driver.
    #[serde(default)]
    pub current_url: String,

    /// The user's task instructions.
    #[serde(default)]
    pub instructions: String,

    #[serde(default)]
    pub refine_hint: Option<String>,

    #[serde(default)]
    pub plan: Option<String>,

    #[serde(default)]
    pub visual_description: Option<String>,

    /// Raw markup of the live page; compacted before use (REFINE_CODE only).
    #[serde(default)]
    pub current_html: Option<String>,

    /// Snapshots to include, in step order.
    #[serde(default)]
    pub snapshots: Vec<SnapshotRequest>,
}

/// Output from the payload_build tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PayloadBuildOutput {
    pub mode: PayloadMode,
    pub payload: String,
    /// Number of referenced snapshots found in the store.
    pub resolved: usize,
    /// Step indices of referenced snapshots that were not cached.
    pub missing: Vec<u32>,
}

/// Implementation of the payload_build tool.
pub async fn build_impl(state: ToolState, params: PayloadBuildParams) -> Result<CallToolResult, McpError> {
    let output = run_blocking(move || {
        let mut snapshots: Vec<Snapshot> = Vec::with_capacity(params.snapshots.len());
        let mut missing = Vec::new();
        for request in &params.snapshots {
            match state.store.read(request) {
                Some(snapshot) => snapshots.push(snapshot),
                None => missing.push(request.step_index),
            }
        }
        if !missing.is_empty() {
            tracing::debug!(mode = %params.mode, ?missing, "payload built without uncached snapshots");
        }

        let current_markup = match (params.mode, params.current_html.as_deref()) {
            (PayloadMode::RefineCode, Some(html)) => Some(state.compactor.compact(html)),
            _ => None,
        };

        let input = PayloadInput {
            current_url: &params.current_url,
            instructions: &params.instructions,
            refine_hint: params.refine_hint.as_deref(),
            plan: params.plan.as_deref(),
            visual_description: params.visual_description.as_deref(),
            current_markup: current_markup.as_deref(),
            snapshots: &snapshots,
        };
        let payload = state.assembler.assemble(params.mode, &input);

        Ok(PayloadBuildOutput { mode: params.mode, payload, resolved: snapshots.len(), missing })
    })
    .await?;

    json_result(&output)
}
