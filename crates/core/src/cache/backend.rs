//! Storage interface behind the snapshot store.
//!
//! Key derivation and payload assembly never see which backend is in use.

use crate::Error;

/// Key → (raw, compacted) artifact storage.
pub trait ArtifactBackend: Send + Sync {
    /// Compacted artifact stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Pre-compaction artifact stored under `key`, if any.
    fn get_raw(&self, key: &str) -> Result<Option<String>, Error>;

    /// Store both artifacts under `key`, replacing any previous pair.
    fn put(&self, key: &str, raw: &str, compacted: &str) -> Result<(), Error>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

impl<B: ArtifactBackend + ?Sized> ArtifactBackend for Box<B> {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        (**self).get(key)
    }

    fn get_raw(&self, key: &str) -> Result<Option<String>, Error> {
        (**self).get_raw(key)
    }

    fn put(&self, key: &str, raw: &str, compacted: &str) -> Result<(), Error> {
        (**self).put(key, raw, compacted)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
