//! Model type registry: constructors, catalogs, cache rules, allowlists.
//!
//! Built once at startup. Registration is the explicit replacement for the
//! source platform's runtime reflection: a model type that is not registered
//! here does not exist as far as the binder is concerned.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::domain::args::ModelArgs;
use crate::model::Model;

use super::MethodCatalog;

/// Declares a catalog method cacheable with the given TTL.
///
/// `seed` replaces the model identity in the cache-key scope, letting
/// unrelated models share one cached variant family on purpose.
#[derive(Debug, Clone)]
pub struct CacheRule {
    pub method: &'static str,
    pub ttl: Duration,
    pub seed: Option<&'static str>,
}

pub type Constructor = Arc<dyn Fn(ModelArgs) -> Box<dyn Model> + Send + Sync>;

/// Registration record for one model type.
pub struct ModelSpec {
    name: &'static str,
    construct: Constructor,
    catalog: MethodCatalog,
    cache_rules: Vec<CacheRule>,
    api_allowlist: Vec<&'static str>,
}

impl ModelSpec {
    pub fn new<F>(name: &'static str, construct: F) -> Self
    where
        F: Fn(ModelArgs) -> Box<dyn Model> + Send + Sync + 'static,
    {
        Self {
            name,
            construct: Arc::new(construct),
            catalog: MethodCatalog::new(),
            cache_rules: Vec::new(),
            api_allowlist: Vec::new(),
        }
    }

    pub fn catalog(mut self, catalog: MethodCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Declare `method` cacheable for `ttl`, scoped to this model's identity.
    pub fn cache(mut self, method: &'static str, ttl: Duration) -> Self {
        self.cache_rules.push(CacheRule {
            method,
            ttl,
            seed: None,
        });
        self
    }

    /// Declare `method` cacheable under an explicit shared seed scope.
    pub fn cache_shared(mut self, method: &'static str, seed: &'static str, ttl: Duration) -> Self {
        self.cache_rules.push(CacheRule {
            method,
            ttl,
            seed: Some(seed),
        });
        self
    }

    /// Permit `method` to run when requested across the remote boundary.
    pub fn allow_remote(mut self, method: &'static str) -> Self {
        self.api_allowlist.push(method);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn method_catalog(&self) -> &MethodCatalog {
        &self.catalog
    }

    pub fn cache_rule(&self, method: &str) -> Option<&CacheRule> {
        self.cache_rules.iter().find(|rule| rule.method == method)
    }

    pub fn allows_remote(&self, method: &str) -> bool {
        self.api_allowlist.iter().any(|name| *name == method)
    }

    pub(crate) fn construct(&self, args: ModelArgs) -> Box<dyn Model> {
        (self.construct)(args)
    }
}

impl fmt::Debug for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSpec")
            .field("name", &self.name)
            .field("cache_rules", &self.cache_rules.len())
            .field("api_allowlist", &self.api_allowlist)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("model type `{0}` is registered twice")]
    DuplicateModel(String),
    #[error("cache rule for `{model}.{method}` does not match any catalog method")]
    DanglingCacheRule { model: String, method: String },
    #[error("allowlist entry `{model}.{method}` does not match any catalog method")]
    DanglingAllowlist { model: String, method: String },
}

/// Startup-built lookup from model type name to its registration.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    specs: HashMap<&'static str, ModelSpec>,
}

impl ModelRegistry {
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder { specs: Vec::new() }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.specs.get(name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[derive(Default)]
pub struct ModelRegistryBuilder {
    specs: Vec<ModelSpec>,
}

impl ModelRegistryBuilder {
    pub fn register(mut self, spec: ModelSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Validate and freeze the registry. Duplicate names and cache/allowlist
    /// declarations that point at no catalog method are startup errors.
    pub fn build(self) -> Result<ModelRegistry, RegistryError> {
        let mut specs = HashMap::with_capacity(self.specs.len());
        for spec in self.specs {
            for rule in &spec.cache_rules {
                if !spec.catalog.contains(rule.method) {
                    return Err(RegistryError::DanglingCacheRule {
                        model: spec.name.to_string(),
                        method: rule.method.to_string(),
                    });
                }
            }
            for method in &spec.api_allowlist {
                if !spec.catalog.contains(method) {
                    return Err(RegistryError::DanglingAllowlist {
                        model: spec.name.to_string(),
                        method: method.to_string(),
                    });
                }
            }
            if specs.contains_key(spec.name) {
                return Err(RegistryError::DuplicateModel(spec.name.to_string()));
            }
            specs.insert(spec.name, spec);
        }
        Ok(ModelRegistry { specs })
    }
}
