//! MCP tool implementations.
//!
//! This module contains all tools exposed by the mcp-pagectx server. Tool
//! bodies are synchronous (compaction and cache I/O), so each runs on
//! the blocking pool through [`run_blocking`].

use std::sync::Arc;

use pagectx_context::{Compactor, PayloadAssembler};
use pagectx_core::SnapshotStore;
use pagectx_core::cache::ArtifactBackend;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

pub mod page_compact;
pub mod payload_build;
pub mod snapshot_capture;
pub mod snapshot_get;

pub use page_compact::PageCompactParams;
pub use payload_build::PayloadBuildParams;
pub use snapshot_capture::SnapshotCaptureParams;
pub use snapshot_get::SnapshotGetParams;

/// Snapshot store over whichever backend the config selected.
pub type Store = SnapshotStore<Box<dyn ArtifactBackend>>;

/// State shared by every tool call.
#[derive(Clone)]
pub struct ToolState {
    pub store: Arc<Store>,
    pub compactor: Compactor,
    pub assembler: PayloadAssembler,
}

impl ToolState {
    pub fn new(store: Store, compactor: Compactor, assembler: PayloadAssembler) -> Self {
        Self { store: Arc::new(store), compactor, assembler }
    }
}

/// Run `f` on the blocking pool.
pub async fn run_blocking<F, R>(f: F) -> Result<R, McpError>
where
    F: FnOnce() -> Result<R, McpError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| McpError::internal_error(format!("tool task failed: {e}"), None))?
}

/// Wrap a tool output as pretty-printed JSON text content.
pub fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| McpError::internal_error(format!("Failed to serialize output: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use pagectx_core::cache::ArtifactDb;

    pub fn state() -> ToolState {
        let backend: Box<dyn ArtifactBackend> = Box::new(ArtifactDb::open_in_memory().unwrap());
        ToolState::new(SnapshotStore::new(backend), Compactor::default(), PayloadAssembler::default())
    }

    pub fn output<T: serde::de::DeserializeOwned>(result: &CallToolResult) -> T {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}
