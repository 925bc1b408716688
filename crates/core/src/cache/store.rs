//! Snapshot store: key derivation, legacy resolution and artifact validation
//! on top of an [`ArtifactBackend`].
//!
//! Caching is an optimization. Every backend failure is logged and turned
//! into "no cache effect" (`None`) instead of reaching the caller.

use super::backend::ArtifactBackend;
use super::hash::LegacyKeyScheme;
use super::snapshots::{AriaArtifact, CaptureMode, Snapshot, SnapshotRequest};

/// Where a successful read was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Current,
    Legacy(LegacyKeyScheme),
}

/// Snapshot cache over a swappable artifact backend.
#[derive(Debug, Clone)]
pub struct SnapshotStore<B> {
    backend: B,
    promote_legacy: bool,
}

impl<B: ArtifactBackend> SnapshotStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend, promote_legacy: true }
    }

    /// Whether legacy hits are copied under the current key (default: true).
    pub fn with_legacy_promotion(mut self, enabled: bool) -> Self {
        self.promote_legacy = enabled;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Persist both artifacts and return the resulting snapshot.
    ///
    /// Returns `None` when persistence fails; the caller proceeds uncached.
    pub fn write(&self, request: &SnapshotRequest, raw: &str, compacted: &str) -> Option<Snapshot> {
        let key = request.cache_key();
        match self.backend.put(&key, raw, compacted) {
            Ok(()) => {
                tracing::debug!(
                    backend = self.backend.name(),
                    key = %key,
                    step = request.step_index,
                    mode = %request.capture_mode,
                    raw_len = raw.len(),
                    compacted_len = compacted.len(),
                    "snapshot cached"
                );
                Some(Snapshot::from_request(request, key, compacted.to_string()))
            }
            Err(err) => {
                tracing::warn!(backend = self.backend.name(), key = %key, error = %err, "snapshot write failed");
                None
            }
        }
    }

    /// Look up a cached snapshot for `request`.
    pub fn read(&self, request: &SnapshotRequest) -> Option<Snapshot> {
        self.read_with_source(request).map(|(snapshot, _)| snapshot)
    }

    /// Like [`read`](Self::read), also reporting which key scheme matched.
    pub fn read_with_source(&self, request: &SnapshotRequest) -> Option<(Snapshot, KeySource)> {
        let key = request.cache_key();
        let (artifact, source) = match self.lookup(&key) {
            Some(artifact) => (artifact, KeySource::Current),
            None if request.capture_mode == CaptureMode::RawHtml => self.lookup_legacy(request)?,
            None => return None,
        };

        if artifact.trim().is_empty() {
            tracing::debug!(key = %key, "cached artifact is blank, treating as miss");
            return None;
        }

        if request.capture_mode == CaptureMode::AriaSnapshot && !AriaArtifact::parse(&artifact).is_usable() {
            tracing::warn!(key = %key, "cached ARIA snapshot has no text and no tree, treating as miss");
            return None;
        }

        if let KeySource::Legacy(scheme) = source {
            tracing::debug!(key = %key, ?scheme, "resolved snapshot through legacy key");
            if self.promote_legacy {
                self.promote(request, &key, scheme, &artifact);
            }
        }

        Some((Snapshot::from_request(request, key, artifact), source))
    }

    /// Raw pre-compaction artifact for `request`, current key only.
    pub fn read_raw(&self, request: &SnapshotRequest) -> Option<String> {
        let key = request.cache_key();
        match self.backend.get_raw(&key) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(backend = self.backend.name(), key = %key, error = %err, "raw artifact read failed");
                None
            }
        }
    }

    fn lookup(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(backend = self.backend.name(), key = %key, error = %err, "snapshot read failed");
                None
            }
        }
    }

    fn lookup_legacy(&self, request: &SnapshotRequest) -> Option<(String, KeySource)> {
        LegacyKeyScheme::LOOKUP_ORDER.into_iter().find_map(|scheme| {
            let legacy_key = scheme.key(&request.url, &request.entry_action);
            self.lookup(&legacy_key)
                .map(|artifact| (artifact, KeySource::Legacy(scheme)))
        })
    }

    fn promote(&self, request: &SnapshotRequest, key: &str, scheme: LegacyKeyScheme, artifact: &str) {
        let legacy_key = scheme.key(&request.url, &request.entry_action);
        let raw = match self.backend.get_raw(&legacy_key) {
            Ok(raw) => raw.unwrap_or_default(),
            Err(_) => String::new(),
        };
        if let Err(err) = self.backend.put(key, &raw, artifact) {
            tracing::warn!(key = %key, error = %err, "legacy snapshot promotion failed");
        }
    }
}
