//! Cache store: key-value persistence for contributor stats with a 7-day TTL.
//!
//! Entries are keyed `gce-cache-{contributor}|{scopeKey}` where the scope key
//! is an `org/repo` path, an org name, or `__self`. Freshness derives from the
//! record's own `last_update`; a stale or missing entry reads back as an empty
//! record. The backing storage sits behind the [`Storage`] trait with a
//! uniform `Result<_, StorageError>` surface.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

use crate::stats::ContributorStats;

pub const CACHE_PREFIX: &str = "gce-cache-";

/// Cache validity window: 7 days, in milliseconds.
pub const CACHE_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("storage encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Flat string-keyed storage.
pub trait Storage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

pub struct CacheStore<S> {
    storage: S,
}

impl<S: Storage> CacheStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Cached record for `(contributor, scope_key)` if present and younger
    /// than the TTL at `now_ms`; an empty record otherwise. A corrupt entry
    /// reads as a miss rather than an error.
    pub fn get(
        &self,
        contributor: &str,
        scope_key: &str,
        now_ms: i64,
    ) -> Result<ContributorStats, StorageError> {
        let Some(raw) = self.storage.read(&entry_key(contributor, scope_key))? else {
            return Ok(ContributorStats::default());
        };

        let stats: ContributorStats = serde_json::from_str(&raw).unwrap_or_default();
        match stats.last_update {
            Some(last) if now_ms - last < CACHE_TTL_MS => Ok(stats),
            _ => Ok(ContributorStats::default()),
        }
    }

    /// Unconditional overwrite. A quota-exhausted write clears the cache
    /// namespace (settings live elsewhere and keep the token) and retries
    /// once; this is the only retry policy in the system.
    pub fn set(
        &self,
        contributor: &str,
        scope_key: &str,
        stats: &ContributorStats,
    ) -> Result<(), StorageError> {
        let key = entry_key(contributor, scope_key);
        let raw = serde_json::to_string(stats)?;

        match self.storage.write(&key, raw.clone()) {
            Err(StorageError::QuotaExceeded) => {
                tracing::warn!("storage quota exceeded; clearing cache namespace and retrying");
                self.clear(None)?;
                self.storage.write(&key, raw)
            }
            other => other,
        }
    }

    /// Remove all namespace entries, or only those belonging to `contributor`.
    /// Returns the number of entries removed.
    pub fn clear(&self, contributor: Option<&str>) -> Result<usize, StorageError> {
        let mut removed = 0;
        for key in self.storage.keys()? {
            let Some(rest) = key.strip_prefix(CACHE_PREFIX) else {
                continue;
            };
            let matches = match contributor {
                Some(c) => rest.split_once('|').is_some_and(|(owner, _)| owner == c),
                None => true,
            };
            if matches {
                self.storage.remove(&key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn entry_key(contributor: &str, scope_key: &str) -> String {
    format!("{CACHE_PREFIX}{contributor}|{scope_key}")
}

/// JSON-file storage under the platform state directory.
///
/// The whole map is held in memory and rewritten on every mutation; the cache
/// is a handful of small records, so this stays well under any practical
/// size. Disk-full and quota I/O errors surface as `QuotaExceeded` so the
/// cache store can run its recovery path.
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    pub fn open(path: PathBuf) -> Result<Self, StorageError> {
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("cache file {} is corrupt ({e}); starting empty", path.display());
                BTreeMap::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(map_io)?;
        }
        let raw = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, raw).map_err(map_io)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn map_io(e: io::Error) -> StorageError {
    match e.kind() {
        io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded => StorageError::QuotaExceeded,
        _ => StorageError::Io(e),
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut entries = self.lock();
        let previous = entries.insert(key.to_string(), value);
        if let Err(e) = self.persist(&entries) {
            // Roll the in-memory view back so it keeps matching the file.
            match previous {
                Some(prev) => entries.insert(key.to_string(), prev),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.lock();
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.lock().keys().cloned().collect())
    }
}

/// In-memory storage for tests, with an optional byte quota so the
/// quota-recovery path can be exercised.
#[cfg(test)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            quota_bytes: None,
        }
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut entries = self.lock();
        if let Some(quota) = self.quota_bytes {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.lock().keys().cloned().collect())
    }
}
