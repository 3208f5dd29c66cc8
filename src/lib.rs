//! Trama — a model data-binding and caching engine for CMS hosts.
//!
//! Trama assembles the data tree a text-template renderer consumes. The host
//! routes a request to a registered root model; the binder resolves the
//! model's method catalog, runs each eligible method (cache-checked), lets
//! methods compose submodels recursively, and returns the merged tree.
//!
//! - [`catalog`] — per-type method catalogs and the model registry.
//! - [`model`] — the [`model::Model`] contract, the [`model::Binder`]
//!   engine, and the [`model::BindScope`] handed to method bodies.
//! - [`domain`] — arguments, the data tree, merge rules, and error taxonomy.
//! - [`cache`] — method-result memoization over a TTL key-value store, with
//!   submodel replay and bulk invalidation indexes.
//! - [`infra`] — telemetry bootstrap and the remote invocation HTTP surface.
//! - [`config`] — layered deployment settings (`trama.toml` + `TRAMA_*`).

pub mod cache;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod infra;
pub mod model;
