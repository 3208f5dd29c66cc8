//! Cache configuration.
//!
//! Controls the method-result cache via `trama.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

// Default values for cache configuration
const DEFAULT_ENTRY_LIMIT: usize = 1024;
const DEFAULT_INDEX_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Method-cache configuration from `trama.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable method-result caching.
    pub enabled: bool,
    /// Maximum entries held by the bundled in-memory transient store.
    pub entry_limit: usize,
    /// TTL (seconds) for per-(identity, method) index records.
    pub index_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            entry_limit: DEFAULT_ENTRY_LIMIT,
            index_ttl_secs: DEFAULT_INDEX_TTL_SECS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            entry_limit: settings.entry_limit,
            index_ttl_secs: settings.index_ttl_secs,
        }
    }
}

impl CacheConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn entry_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.entry_limit).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn index_ttl(&self) -> Duration {
        Duration::from_secs(self.index_ttl_secs)
    }
}
