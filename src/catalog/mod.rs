//! Method discovery: per-type catalogs, override shadowing, run order.
//!
//! The source platform discovered data-binding methods through runtime
//! reflection over a class hierarchy. Here every model type declares its
//! method layers explicitly at registration time: ancestor layers first, the
//! concrete type's own layer last. Resolution preserves the inherited
//! semantics — the most-derived declaration of a name wins, and base-most
//! layers run before derived ones.

mod registry;

pub use registry::{
    CacheRule, Constructor, ModelRegistry, ModelRegistryBuilder, ModelSpec, RegistryError,
};

use std::collections::HashSet;

use crate::domain::error::BindError;

/// Method visibility in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Runs automatically when zero-argument, callable by anyone.
    Public,
    /// Runs only when explicitly requested and authorized.
    Restricted,
}

/// Whether a method can run without arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Zero,
    /// Excluded from automatic execution; invoked manually by other methods.
    Parameterized,
}

/// A single registered data-binding method.
#[derive(Debug, Clone)]
pub struct MethodSpec {
    pub name: &'static str,
    pub visibility: Visibility,
    pub arity: Arity,
}

/// Methods declared by one type in an ancestry chain.
#[derive(Debug, Clone)]
pub struct MethodLayer {
    declared_by: &'static str,
    methods: Vec<MethodSpec>,
}

impl MethodLayer {
    pub fn new(declared_by: &'static str) -> Self {
        Self {
            declared_by,
            methods: Vec::new(),
        }
    }

    pub fn public_zero(mut self, name: &'static str) -> Self {
        self.methods.push(MethodSpec {
            name,
            visibility: Visibility::Public,
            arity: Arity::Zero,
        });
        self
    }

    pub fn restricted(mut self, name: &'static str) -> Self {
        self.methods.push(MethodSpec {
            name,
            visibility: Visibility::Restricted,
            arity: Arity::Zero,
        });
        self
    }

    pub fn parameterized(mut self, name: &'static str) -> Self {
        self.methods.push(MethodSpec {
            name,
            visibility: Visibility::Public,
            arity: Arity::Parameterized,
        });
        self
    }

    pub fn declared_by(&self) -> &'static str {
        self.declared_by
    }
}

/// One method scheduled for execution.
#[derive(Debug, Clone)]
pub struct PlannedCall {
    pub declared_by: &'static str,
    pub method: &'static str,
    pub visibility: Visibility,
    /// Conventional `bind_` prefix stripped from the method name.
    pub data_key: &'static str,
}

/// Execution buckets produced by catalog resolution.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    /// Public zero-argument methods, base-most layer first.
    pub auto: Vec<PlannedCall>,
    /// Non-public methods that were explicitly requested.
    pub restricted: Vec<PlannedCall>,
}

/// Ordered, de-duplicated method catalog for a registered model type.
///
/// Layers are held base-most first, matching registration order. The base
/// model type itself contributes no layer — only declared layers exist.
#[derive(Debug, Clone, Default)]
pub struct MethodCatalog {
    layers: Vec<MethodLayer>,
}

impl MethodCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer(mut self, layer: MethodLayer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layers
            .iter()
            .any(|layer| layer.methods.iter().any(|spec| spec.name == name))
    }

    /// Look up the effective (most-derived) declaration of a method.
    pub fn find(&self, name: &str) -> Option<(&'static str, &MethodSpec)> {
        self.layers.iter().rev().find_map(|layer| {
            layer
                .methods
                .iter()
                .find(|spec| spec.name == name)
                .map(|spec| (layer.declared_by, spec))
        })
    }

    /// Resolve the execution plan.
    ///
    /// Without a function list: every effective public zero-argument method,
    /// in layer order. With one: only the requested methods, still in layer
    /// order; an unknown name is fatal, and a parameterized method cannot be
    /// requested at all.
    pub fn plan(&self, model: &str, functions: Option<&[String]>) -> Result<ExecutionPlan, BindError> {
        let picked = self.effective();

        let mut plan = ExecutionPlan::default();
        match functions {
            None => {
                for (layer, spec) in picked {
                    if spec.visibility == Visibility::Public && spec.arity == Arity::Zero {
                        plan.auto.push(planned(layer, spec));
                    }
                }
            }
            Some(requested) => {
                for name in requested {
                    if !self.contains(name) {
                        return Err(BindError::unknown_method(model, name));
                    }
                }
                for (layer, spec) in picked {
                    if !requested.iter().any(|name| name == spec.name) {
                        continue;
                    }
                    if spec.arity == Arity::Parameterized {
                        return Err(BindError::not_callable(model, spec.name));
                    }
                    match spec.visibility {
                        Visibility::Public => plan.auto.push(planned(layer, spec)),
                        Visibility::Restricted => plan.restricted.push(planned(layer, spec)),
                    }
                }
            }
        }
        Ok(plan)
    }

    /// Shadow-resolved method list in run order.
    ///
    /// The most-derived declaration of a name wins and keeps its own layer
    /// position; shadowed ancestor declarations are discarded entirely.
    fn effective(&self) -> Vec<(&'static str, &MethodSpec)> {
        let mut seen = HashSet::new();
        let mut picked: Vec<(usize, usize, &'static str, &MethodSpec)> = Vec::new();
        for (li, layer) in self.layers.iter().enumerate().rev() {
            for (mi, spec) in layer.methods.iter().enumerate() {
                if seen.insert(spec.name) {
                    picked.push((li, mi, layer.declared_by, spec));
                }
            }
        }
        picked.sort_by_key(|(li, mi, _, _)| (*li, *mi));
        picked
            .into_iter()
            .map(|(_, _, declared_by, spec)| (declared_by, spec))
            .collect()
    }
}

fn planned(declared_by: &'static str, spec: &MethodSpec) -> PlannedCall {
    PlannedCall {
        declared_by,
        method: spec.name,
        visibility: spec.visibility,
        data_key: spec.name.strip_prefix("bind_").unwrap_or(spec.name),
    }
}
