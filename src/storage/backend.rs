//! Physical key/value backends
//!
//! Directory layout of the file backend:
//! ```text
//! ~/.carevault/store/
//! ├── chat_history.val
//! ├── medicine_history.val
//! └── ...
//! ```
//!
//! Each write replaces a whole value atomically (temp file + rename), so a
//! failed write leaves the previous value intact.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

const VALUE_EXTENSION: &str = "val";

/// A string key/value store
pub trait KvBackend: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value (absent keys are not an error)
    fn remove(&self, key: &str) -> Result<()>;

    /// Delete every value
    fn clear(&self) -> Result<()>;

    /// All key/value pairs, ordered by key
    fn entries(&self) -> Result<Vec<(String, String)>>;
}

/// Encoded size of one entry
pub fn entry_size(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}

/// Check a pending write against a byte ceiling.
///
/// `current` is the store size including the old value of `key`, if any.
fn check_quota(
    quota: Option<u64>,
    current: u64,
    old_entry: u64,
    key: &str,
    value: &str,
) -> Result<()> {
    if let Some(ceiling) = quota {
        let needed = current - old_entry + entry_size(key, value);
        if needed > ceiling {
            return Err(Error::QuotaExceeded { needed, ceiling });
        }
    }
    Ok(())
}

// =============================================================================
// Memory backend
// =============================================================================

/// In-process backend.
///
/// Serves as the volatile per-navigation store and as the test double of the
/// durable store. Counts successful physical writes.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<String, String>>,
    quota: Option<u64>,
    writes: AtomicU64,
}

impl MemoryBackend {
    /// Create an unbounded memory backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory backend that rejects writes past `quota` bytes
    pub fn with_quota(quota: u64) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Number of successful `set` calls so far
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.lock();
        let current: u64 = entries.iter().map(|(k, v)| entry_size(k, v)).sum();
        let old = entries.get(key).map(|v| entry_size(key, v)).unwrap_or(0);
        check_quota(self.quota, current, old, key, value)?;

        entries.insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.lock().clear();
        Ok(())
    }

    fn entries(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

// =============================================================================
// File backend
// =============================================================================

/// Durable backend storing one file per key
pub struct FileBackend {
    dir: PathBuf,
    quota: Option<u64>,
}

impl FileBackend {
    /// Open (and create if needed) a file backend rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>, quota: Option<u64>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, quota })
    }

    /// Root directory of the backend
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(Error::Storage(format!("Invalid storage key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.{}", key, VALUE_EXTENSION)))
    }
}

impl KvBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;

        if self.quota.is_some() {
            let entries = self.entries()?;
            let current: u64 = entries.iter().map(|(k, v)| entry_size(k, v)).sum();
            let old = entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(k, v)| entry_size(k, v))
                .unwrap_or(0);
            check_quota(self.quota, current, old, key, value)?;
        }

        let tmp = path.with_extension(format!("{}.tmp", VALUE_EXTENSION));
        std::fs::write(&tmp, value)?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(Error::Io(e));
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn clear(&self) -> Result<()> {
        for (key, _) in self.entries()? {
            self.remove(&key)?;
        }
        Ok(())
    }

    fn entries(&self) -> Result<Vec<(String, String)>> {
        let mut items = Vec::new();
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(items),
            Err(e) => return Err(Error::Io(e)),
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(VALUE_EXTENSION) {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match std::fs::read_to_string(&path) {
                Ok(value) => items.push((key.to_string(), value)),
                Err(e) => tracing::warn!("Failed to read {}: {}", path.display(), e),
            }
        }

        items.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(items)
    }
}
