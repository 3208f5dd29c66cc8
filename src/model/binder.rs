//! Fetch orchestration: catalog execution, caching, submodel composition.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::cache::{CacheConfig, CachedCall, MemoryStore, MethodCache, SubCall, TransientStore, generate_cache_key};
use crate::catalog::{ModelRegistry, ModelSpec, PlannedCall, Visibility};
use crate::config::Settings;
use crate::domain::args::ModelArgs;
use crate::domain::error::BindError;
use crate::domain::tree::DataTree;

use super::hooks::BinderHooks;
use super::scope::BindScope;
use super::{CallContext, Model};

const DEFAULT_MAX_BIND_DEPTH: usize = 64;

/// Result of a full tree fetch, ready for the external renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    /// Assembled data tree: model identity → bound data.
    pub tree: Value,
    /// True when some model terminated the cycle early.
    pub terminated: bool,
}

/// Engine that executes model catalogs against a registry.
///
/// One binder serves many requests; all per-request state lives in the node
/// and tree created for each fetch.
pub struct Binder {
    registry: ModelRegistry,
    cache: MethodCache,
    hooks: BinderHooks,
    max_bind_depth: usize,
}

impl Binder {
    pub fn builder(registry: ModelRegistry) -> BinderBuilder {
        BinderBuilder {
            registry,
            store: None,
            cache_config: CacheConfig::default(),
            hooks: BinderHooks::default(),
            max_bind_depth: DEFAULT_MAX_BIND_DEPTH,
        }
    }

    /// Fetch the full data tree for a root model.
    pub fn fetch(&self, model: &str, args: ModelArgs) -> Result<FetchResult, BindError> {
        self.fetch_root(model, None, args)
    }

    /// Fetch under a renamed identity (template-grouping).
    pub fn fetch_as(
        &self,
        model: &str,
        identity: &str,
        args: ModelArgs,
    ) -> Result<FetchResult, BindError> {
        self.fetch_root(model, Some(identity), args)
    }

    /// Tidy fetch: a flat data-key → value map, bypassing tree assembly.
    /// Used for partial responses; `functions` optionally narrows the run.
    pub fn fetch_tidy(
        &self,
        model: &str,
        args: ModelArgs,
        functions: Option<&[String]>,
    ) -> Result<Map<String, Value>, BindError> {
        let spec = self
            .registry
            .get(model)
            .ok_or_else(|| BindError::unknown_model(model))?;
        let node = NodeState::new(spec.name().to_string(), args, Vec::new());
        let run = self.run_node(
            spec,
            node,
            RunOptions {
                functions,
                tidy: true,
                context: CallContext::Normal,
                use_cache: true,
            },
        )?;
        Ok(run.tidy)
    }

    /// Remote-boundary entry point.
    ///
    /// Pre-authorizes every requested restricted method so no partial data
    /// is ever computed next to an error, then runs a tidy fetch in the
    /// remote context.
    pub fn invoke_remote(
        &self,
        model: &str,
        args: ModelArgs,
        functions: &[String],
    ) -> Result<Map<String, Value>, BindError> {
        let spec = self
            .registry
            .get(model)
            .ok_or_else(|| BindError::unknown_model(model))?;
        let plan = spec.method_catalog().plan(spec.name(), Some(functions))?;
        for call in &plan.restricted {
            if !spec.allows_remote(call.method) {
                warn!(
                    model = spec.name(),
                    method = call.method,
                    "Rejected remote invocation of non-allowlisted method"
                );
                return Err(BindError::not_authorized(spec.name(), call.method));
            }
        }
        let node = NodeState::new(spec.name().to_string(), args, Vec::new());
        let run = self.run_node(
            spec,
            node,
            RunOptions {
                functions: Some(functions),
                tidy: true,
                context: CallContext::Remote,
                use_cache: true,
            },
        )?;
        Ok(run.tidy)
    }

    /// Tombstone every cached argument variant of (scope, method).
    pub fn invalidate_method(&self, scope: &str, method: &str) -> usize {
        self.cache.invalidate_method(scope, method)
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub(crate) fn max_bind_depth(&self) -> usize {
        self.max_bind_depth
    }

    fn fetch_root(
        &self,
        model: &str,
        identity: Option<&str>,
        args: ModelArgs,
    ) -> Result<FetchResult, BindError> {
        let spec = self
            .registry
            .get(model)
            .ok_or_else(|| BindError::unknown_model(model))?;
        let node = NodeState::new(
            identity.unwrap_or(spec.name()).to_string(),
            args,
            Vec::new(),
        );
        let run = self.run_node(
            spec,
            node,
            RunOptions {
                functions: None,
                tidy: false,
                context: CallContext::Normal,
                use_cache: true,
            },
        )?;
        Ok(FetchResult {
            tree: run.tree.into_value(),
            terminated: run.terminated,
        })
    }

    /// Execute one model's catalog: the auto bucket, then the restricted
    /// bucket, stopping as soon as the node terminates.
    pub(crate) fn run_node(
        &self,
        spec: &ModelSpec,
        mut node: NodeState,
        opts: RunOptions<'_>,
    ) -> Result<NodeRun, BindError> {
        let started = Instant::now();
        let mut plan = spec.method_catalog().plan(spec.name(), opts.functions)?;
        self.hooks.apply_plan(&mut plan);
        debug!(
            model = spec.name(),
            identity = %node.identity,
            auto = plan.auto.len(),
            restricted = plan.restricted.len(),
            "Fetching model data"
        );

        let mut model = spec.construct(node.args.clone());
        let mut tree = DataTree::new();
        tree.ensure(&node.identity);
        let mut tidy = Map::new();

        'buckets: for (bucket, restricted) in [(&plan.auto, false), (&plan.restricted, true)] {
            for call in bucket {
                let value = if restricted {
                    self.run_restricted(spec, &mut *model, call, &mut node, &mut tree, &opts)?
                } else {
                    self.run_function(spec, &mut *model, call, &mut node, &mut tree, &opts)?
                };
                if let Some(value) = value {
                    if opts.tidy {
                        tidy.insert(call.data_key.to_string(), value);
                    } else {
                        tree.set(&node.identity, call.data_key, value);
                    }
                }
                if node.terminated {
                    break 'buckets;
                }
            }
        }

        histogram!("trama_fetch_ms").record(started.elapsed().as_secs_f64() * 1000.0);
        Ok(NodeRun {
            tree,
            tidy,
            terminated: node.terminated,
        })
    }

    /// Execute a single method, transparently using cache.
    ///
    /// On a hit the recorded submodel calls are replayed (with caching
    /// disabled for the replays) and the cached data is returned without
    /// invoking the body.
    fn run_function(
        &self,
        spec: &ModelSpec,
        model: &mut dyn Model,
        call: &PlannedCall,
        node: &mut NodeState,
        tree: &mut DataTree,
        opts: &RunOptions<'_>,
    ) -> Result<Option<Value>, BindError> {
        let rule = spec.cache_rule(call.method);
        let cache_key = match rule {
            Some(rule) if opts.use_cache && self.cache.enabled() => {
                let scope_name = rule.seed.unwrap_or(node.identity.as_str());
                Some(self.method_key(scope_name, &node.canonical_args, call.method))
            }
            _ => None,
        };

        if let Some(key) = &cache_key
            && let Some(hit) = self.cache.lookup(key)
        {
            let mut scope = BindScope::new(self, node, tree, opts.context, false);
            for sub in &hit.subs {
                scope.bind_sub_replay(sub)?;
            }
            counter!("trama_cache_replay_total").increment(hit.subs.len() as u64);
            return Ok(hit.data);
        }

        node.called_submodels.clear();
        let result = {
            let mut scope = BindScope::new(self, node, tree, opts.context, opts.use_cache);
            model.invoke(call.method, &mut scope)?
        };
        let subs = std::mem::take(&mut node.called_submodels);

        if let (Some(key), Some(rule)) = (cache_key, rule) {
            let scope_name = rule.seed.unwrap_or(node.identity.as_str());
            let payload = CachedCall {
                data: result.clone(),
                subs,
            };
            self.cache
                .store_call(&key, scope_name, call.method, &payload, rule.ttl);
        }
        Ok(result)
    }

    /// Re-check authorization and run, or yield a structured error value
    /// instead of invoking anything.
    fn run_restricted(
        &self,
        spec: &ModelSpec,
        model: &mut dyn Model,
        call: &PlannedCall,
        node: &mut NodeState,
        tree: &mut DataTree,
        opts: &RunOptions<'_>,
    ) -> Result<Option<Value>, BindError> {
        if !self.is_function_allowed(spec, call, opts.context) {
            warn!(
                model = spec.name(),
                method = call.method,
                context = ?opts.context,
                "Denied restricted method invocation"
            );
            return Ok(Some(denied_value(call.method)));
        }
        self.run_function(spec, model, call, node, tree, opts)
    }

    fn is_function_allowed(
        &self,
        spec: &ModelSpec,
        call: &PlannedCall,
        context: CallContext,
    ) -> bool {
        match context {
            CallContext::Normal => call.visibility == Visibility::Public,
            CallContext::Remote => spec.allows_remote(call.method),
        }
    }

    fn method_key(&self, scope: &str, canonical_args: &str, method: &str) -> String {
        generate_cache_key(&[scope, canonical_args, method], |material| {
            self.hooks.apply_key_seed(material)
        })
    }
}

fn denied_value(method: &str) -> Value {
    json!({ "error": format!("method `{method}` is not allowed") })
}

pub struct BinderBuilder {
    registry: ModelRegistry,
    store: Option<Arc<dyn TransientStore>>,
    cache_config: CacheConfig,
    hooks: BinderHooks,
    max_bind_depth: usize,
}

impl BinderBuilder {
    /// Use an external transient store instead of the bundled in-memory one.
    pub fn store(mut self, store: Arc<dyn TransientStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    pub fn hooks(mut self, hooks: BinderHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn max_bind_depth(mut self, depth: usize) -> Self {
        self.max_bind_depth = depth;
        self
    }

    /// Apply deployment settings (cache + binder sections).
    pub fn settings(mut self, settings: &Settings) -> Self {
        self.cache_config = CacheConfig::from(&settings.cache);
        self.max_bind_depth = settings.binder.max_bind_depth;
        self
    }

    pub fn build(self) -> Binder {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new(&self.cache_config)));
        Binder {
            registry: self.registry,
            cache: MethodCache::new(store, self.cache_config),
            hooks: self.hooks,
            max_bind_depth: self.max_bind_depth,
        }
    }
}

/// Per-fetch state for one model node.
pub(crate) struct NodeState {
    pub(crate) identity: String,
    pub(crate) args: ModelArgs,
    pub(crate) canonical_args: String,
    /// Ancestor identities, root first; empty for a root model.
    pub(crate) path: Vec<String>,
    pub(crate) terminated: bool,
    pub(crate) called_submodels: Vec<SubCall>,
}

impl NodeState {
    pub(crate) fn new(identity: String, args: ModelArgs, path: Vec<String>) -> Self {
        let canonical_args = args.canonical();
        Self {
            identity,
            args,
            canonical_args,
            path,
            terminated: false,
            called_submodels: Vec::new(),
        }
    }

    pub(crate) fn is_sub(&self) -> bool {
        !self.path.is_empty()
    }

    pub(crate) fn depth(&self) -> usize {
        self.path.len()
    }
}

/// Options for one node run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RunOptions<'f> {
    pub(crate) functions: Option<&'f [String]>,
    pub(crate) tidy: bool,
    pub(crate) context: CallContext,
    pub(crate) use_cache: bool,
}

/// Outcome of one node run, merged by the parent (or returned at the root).
pub(crate) struct NodeRun {
    pub(crate) tree: DataTree,
    pub(crate) tidy: Map<String, Value>,
    pub(crate) terminated: bool,
}
