//! Core types and shared functionality for pagectx.
//!
//! This crate provides:
//! - Snapshot cache with filesystem and SQLite backends
//! - URL normalization and free-text URL harvesting
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod urls;

pub use cache::{CaptureMode, Snapshot, SnapshotRequest, SnapshotStore};
pub use config::AppConfig;
pub use error::Error;
