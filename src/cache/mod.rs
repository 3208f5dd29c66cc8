//! Trama method-result cache
//!
//! Memoizes declared-cacheable model method invocations in an external TTL
//! key-value store:
//!
//! - **Keys**: SHA-256 digests of (identity-or-seed, canonical arguments,
//!   method), see `keys`.
//! - **Payloads**: the method's return data plus the submodel calls it made,
//!   so a cache hit can replay composition without re-running the body.
//! - **Indexes**: per-(scope, method) hash lists enabling bulk invalidation
//!   across every argument variant.
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `trama.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! entry_limit = 1024
//! index_ttl_secs = 2592000
//! ```

mod config;
mod keys;
mod lock;
mod method;
mod store;

pub use config::CacheConfig;
pub use keys::generate_cache_key;
pub use method::{CachedCall, MethodCache, SubCall};
pub use store::{MemoryStore, StoreError, TransientStore};
