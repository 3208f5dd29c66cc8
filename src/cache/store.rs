//! Transient storage: the TTL key-value contract and the bundled in-memory
//! implementation.

use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use lru::LruCache;
use serde_json::Value;
use thiserror::Error;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transient store backend error: {message}")]
    Backend { message: String },
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Contract over an external TTL key-value store.
///
/// `get` distinguishes "absent" (`Ok(None)`) from a legitimately cached
/// null/falsy value (`Ok(Some(Value::Null))` etc.). There is no delete
/// primitive; invalidation overwrites entries with an immediately-expiring
/// value and otherwise relies on natural TTL expiry.
pub trait TransientStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), StoreError>;
}

struct MemoryEntry {
    value: Value,
    expires_at: Instant,
}

/// Bounded in-memory store used when the host supplies no external one.
///
/// LRU-evicted at the configured entry limit; entries expire lazily on read.
pub struct MemoryStore {
    entries: RwLock<LruCache<String, MemoryEntry>>,
}

impl MemoryStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_capacity(config.entry_limit_non_zero())
    }

    pub fn with_capacity(limit: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(limit)),
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TransientStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .unwrap_or_else(|| now + Duration::from_secs(365 * 24 * 60 * 60));
        rw_write(&self.entries, SOURCE, "set").put(key.to_string(), MemoryEntry { value, expires_at });
        Ok(())
    }
}
