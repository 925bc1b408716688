//! Filesystem artifact backend.
//!
//! Layout under the cache root:
//!
//! ```text
//! <root>/<key>.raw.html
//! <root>/<key>.cleaned.html
//! ```
//!
//! Each file is written to a unique temp file and renamed into place, so
//! writers to different keys never interfere and same-key writers resolve
//! to last-write-wins.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::backend::ArtifactBackend;
use super::hash::is_valid_key;
use crate::Error;

const RAW_SUFFIX: &str = "raw.html";
const CLEANED_SUFFIX: &str = "cleaned.html";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Artifact pairs stored as flat files under one directory.
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    /// Use `root` as the cache directory. It is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn raw_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.{RAW_SUFFIX}"))
    }

    pub fn cleaned_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.{CLEANED_SUFFIX}"))
    }
}

impl ArtifactBackend for FsBackend {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        check_key(key)?;
        read_optional(&self.cleaned_path(key))
    }

    fn get_raw(&self, key: &str) -> Result<Option<String>, Error> {
        check_key(key)?;
        read_optional(&self.raw_path(key))
    }

    fn put(&self, key: &str, raw: &str, compacted: &str) -> Result<(), Error> {
        check_key(key)?;
        fs::create_dir_all(&self.root)?;
        write_atomic(&self.raw_path(key), raw.as_bytes())?;
        write_atomic(&self.cleaned_path(key), compacted.as_bytes())?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fs"
    }
}

fn check_key(key: &str) -> Result<(), Error> {
    if is_valid_key(key) { Ok(()) } else { Err(Error::InvalidHash) }
}

fn read_optional(path: &Path) -> Result<Option<String>, Error> {
    match fs::read(path) {
        Ok(bytes) => String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| Error::ArtifactCorrupt(format!("{}: {e}", path.display()))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_extension(format!("{}-{seq}.tmp", std::process::id()));
    let result = (|| {
        let mut file = OpenOptions::new().create(true).write(true).truncate(true).open(&tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::hash::compute_cache_key;
    use crate::cache::snapshots::CaptureMode;

    fn key(url: &str) -> String {
        compute_cache_key(url, "", CaptureMode::RawHtml, false)
    }

    #[test]
    fn test_put_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new(dir.path());
        let key = key("https://example.com");

        backend.put(&key, "<html>raw</html>", "<p>clean</p>").unwrap();

        assert_eq!(backend.get(&key).unwrap().as_deref(), Some("<p>clean</p>"));
        assert_eq!(backend.get_raw(&key).unwrap().as_deref(), Some("<html>raw</html>"));
    }

    #[test]
    fn test_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new(dir.path().join("nested"));
        let key = key("https://example.com");

        backend.put(&key, "raw", "clean").unwrap();

        assert!(dir.path().join("nested").join(format!("{key}.raw.html")).is_file());
        assert!(dir.path().join("nested").join(format!("{key}.cleaned.html")).is_file());
        let leftovers: Vec<_> = fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_get_missing() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new(dir.path());
        assert!(backend.get(&key("https://missing.example")).unwrap().is_none());
    }

    #[test]
    fn test_overwrite_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new(dir.path());
        let key = key("https://example.com");

        backend.put(&key, "raw1", "clean1").unwrap();
        backend.put(&key, "raw2", "clean2").unwrap();

        assert_eq!(backend.get(&key).unwrap().as_deref(), Some("clean2"));
    }

    #[test]
    fn test_rejects_invalid_key() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new(dir.path());
        assert!(matches!(backend.put("../escape", "a", "b"), Err(Error::InvalidHash)));
        assert!(matches!(backend.get("../escape"), Err(Error::InvalidHash)));
    }

    #[test]
    fn test_non_utf8_artifact_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new(dir.path());
        let key = key("https://example.com/binary");
        backend.put(&key, "raw", "clean").unwrap();
        fs::write(backend.cleaned_path(&key), [0xff, 0xfe, 0x00]).unwrap();

        assert!(matches!(backend.get(&key), Err(Error::ArtifactCorrupt(_))));
        assert_eq!(backend.get_raw(&key).unwrap().as_deref(), Some("raw"));
    }

    #[test]
    fn test_concurrent_writers_different_keys() {
        let dir = tempfile::tempdir().unwrap();
        let backend = std::sync::Arc::new(FsBackend::new(dir.path()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let backend = backend.clone();
                std::thread::spawn(move || {
                    let key = key(&format!("https://example.com/{i}"));
                    backend.put(&key, "raw", &format!("clean-{i}")).unwrap();
                    key
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let key = handle.join().unwrap();
            assert_eq!(backend.get(&key).unwrap(), Some(format!("clean-{i}")));
        }
    }
}
