//! Content-addressed snapshot cache.
//!
//! This module provides the page snapshot cache used between agent steps:
//!
//! - Cache keys derived with SHA-256 over URL, entry action and capture mode
//! - Backward-compatible resolution of pre-capture-mode keys
//! - Swappable artifact backends (flat files or SQLite)
//! - Validation of cached ARIA captures

pub mod backend;
pub mod connection;
pub mod fs;
pub mod hash;
pub mod migrations;
pub mod snapshots;
pub mod store;

pub use crate::Error;

pub use backend::ArtifactBackend;
pub use connection::ArtifactDb;
pub use fs::FsBackend;
pub use hash::{LegacyKeyScheme, compute_cache_key};
pub use snapshots::{AriaArtifact, CaptureMode, Snapshot, SnapshotRequest};
pub use store::{KeySource, SnapshotStore};

use crate::config::{AppConfig, CacheBackendKind};

/// Open the backend selected by `config`.
pub fn open_backend(config: &AppConfig) -> Result<Box<dyn ArtifactBackend>, Error> {
    match config.cache_backend {
        CacheBackendKind::Fs => Ok(Box::new(FsBackend::new(&config.cache_dir))),
        CacheBackendKind::Sqlite => Ok(Box::new(ArtifactDb::open(&config.db_path)?)),
    }
}
