//! page_compact tool implementation.
//!
//! Compacts caller-supplied markup. Nothing is cached.

use pagectx_context::{CompactStats, Compactor};
use pagectx_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{json_result, run_blocking};

/// Input parameters for the page_compact tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageCompactParams {
    /// Raw page markup.
    pub html: String,
}

/// Output from the page_compact tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageCompactOutput {
    pub compacted: String,
    pub stats: CompactStats,
}

/// Implementation of the page_compact tool.
pub async fn compact_impl(compactor: Compactor, params: PageCompactParams) -> Result<CallToolResult, McpError> {
    if params.html.trim().is_empty() {
        return Err(Error::InvalidInput("html cannot be empty".into()).into());
    }

    let output = run_blocking(move || {
        let (compacted, stats) = compactor.compact_with_stats(&params.html);
        Ok(PageCompactOutput { compacted, stats })
    })
    .await?;

    json_result(&output)
}
