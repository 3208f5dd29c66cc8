//! Method-result cache: payloads, index upkeep, bulk invalidation.
//!
//! Caching is an optimization, never a correctness dependency: every store
//! or decode failure in here degrades to a miss, logs at warn level, and
//! lets the underlying method run uncached.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::domain::args::ModelArgs;

use super::config::CacheConfig;
use super::keys::generate_cache_key;
use super::store::TransientStore;

const INDEX_MARKER: &str = "index";

/// A recorded submodel call, replayed when the recording method is served
/// from cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCall {
    pub model: String,
    /// Identity override passed to `bind_sub_as`, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(default)]
    pub args: ModelArgs,
}

/// Cached payload for one method invocation: the method's return data plus
/// the submodel calls it made while computing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedCall {
    pub data: Option<Value>,
    #[serde(default)]
    pub subs: Vec<SubCall>,
}

/// TTL cache over method results, with a per-(scope, method) hash index so
/// every cached argument variant of a method can be invalidated at once.
pub struct MethodCache {
    store: Arc<dyn TransientStore>,
    config: CacheConfig,
}

impl MethodCache {
    pub fn new(store: Arc<dyn TransientStore>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    pub fn enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Look up a cached call. Store or decode failures degrade to a miss.
    pub fn lookup(&self, key: &str) -> Option<CachedCall> {
        match self.store.get(key) {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(call) => {
                    counter!("trama_cache_hit_total").increment(1);
                    Some(call)
                }
                Err(err) => {
                    warn!(key, error = %err, "Discarding undecodable cache payload");
                    counter!("trama_cache_error_total").increment(1);
                    None
                }
            },
            Ok(None) => {
                counter!("trama_cache_miss_total").increment(1);
                None
            }
            Err(err) => {
                warn!(key, error = %err, "Cache read failed, treating as miss");
                counter!("trama_cache_error_total").increment(1);
                None
            }
        }
    }

    /// Write a call payload under its hash and fold the hash into the
    /// (scope, method) index.
    pub fn store_call(&self, key: &str, scope: &str, method: &str, call: &CachedCall, ttl: Duration) {
        let payload = match serde_json::to_value(call) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(scope, method, error = %err, "Cache payload serialization failed");
                counter!("trama_cache_error_total").increment(1);
                return;
            }
        };
        if let Err(err) = self.store.set(key, payload, ttl) {
            warn!(scope, method, error = %err, "Cache write failed");
            counter!("trama_cache_error_total").increment(1);
            return;
        }
        counter!("trama_cache_write_total").increment(1);
        self.index_insert(scope, method, key);
    }

    /// Tombstone every hash recorded for (scope, method). Returns how many
    /// entries were overwritten.
    pub fn invalidate_method(&self, scope: &str, method: &str) -> usize {
        let hashes = self.index_read(scope, method);
        let mut invalidated = 0;
        for hash in &hashes {
            match self.store.set(hash, Value::Null, Duration::ZERO) {
                Ok(()) => invalidated += 1,
                Err(err) => {
                    warn!(scope, method, key = %hash, error = %err, "Cache invalidation write failed");
                    counter!("trama_cache_error_total").increment(1);
                }
            }
        }
        if !hashes.is_empty()
            && let Err(err) = self
                .store
                .set(&self.index_key(scope, method), Value::Null, Duration::ZERO)
        {
            warn!(scope, method, error = %err, "Cache index reset failed");
            counter!("trama_cache_error_total").increment(1);
        }
        invalidated
    }

    fn index_key(&self, scope: &str, method: &str) -> String {
        generate_cache_key(&[scope, method, INDEX_MARKER], |material| material)
    }

    fn index_read(&self, scope: &str, method: &str) -> Vec<String> {
        match self.store.get(&self.index_key(scope, method)) {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_default(),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(scope, method, error = %err, "Cache index read failed");
                counter!("trama_cache_error_total").increment(1);
                Vec::new()
            }
        }
    }

    fn index_insert(&self, scope: &str, method: &str, hash: &str) {
        let mut hashes = self.index_read(scope, method);
        if hashes.iter().any(|existing| existing == hash) {
            return;
        }
        hashes.push(hash.to_string());
        let index_key = self.index_key(scope, method);
        let payload = Value::Array(hashes.into_iter().map(Value::String).collect());
        if let Err(err) = self.store.set(&index_key, payload, self.config.index_ttl()) {
            warn!(scope, method, error = %err, "Cache index write failed");
            counter!("trama_cache_error_total").increment(1);
        }
    }
}
