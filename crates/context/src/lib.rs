//! Page context building for the browser agent.
//!
//! This crate provides:
//! - HTML compaction ([`Compactor`]) that strips noise and bounds text
//! - Payload assembly ([`PayloadAssembler`]) for the five prompt modes

pub mod compact;
pub mod payload;

pub use compact::{CompactConfig, CompactStats, Compactor, TRUNCATION_MARKER};
pub use payload::{PayloadAssembler, PayloadInput, PayloadLimits, PayloadMode, resolve_current_url};
