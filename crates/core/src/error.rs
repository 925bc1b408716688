//! Unified error types for pagectx.
//!
//! The snapshot store never lets these escape to its callers; they surface
//! from backends and from the MCP tool layer.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Unified error types for the pagectx crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty HTML).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No cache entry found for the given key.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(#[from] rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Cache key is not a lower-case SHA-256 hex digest.
    #[error("CACHE_ERROR: invalid hash format")]
    InvalidHash,

    /// Filesystem access to the cache directory failed.
    #[error("CACHE_IO: {0}")]
    Io(#[from] std::io::Error),

    /// A cached artifact exists but is not valid UTF-8.
    #[error("ARTIFACT_CORRUPT: {0}")]
    ArtifactCorrupt(String),
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::InvalidHash => (-32002, "Invalid hash format".to_string()),
            Error::Io(e) => (-32003, e.to_string()),
            Error::ArtifactCorrupt(msg) => (-32004, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
