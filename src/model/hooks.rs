//! Host extension points applied around catalog execution.

use crate::catalog::ExecutionPlan;

type PlanFilter = Box<dyn Fn(&mut ExecutionPlan) + Send + Sync>;
type KeySeed = Box<dyn Fn(String) -> String + Send + Sync>;

/// Injected host transformations. Every hook defaults to pass-through.
#[derive(Default)]
pub struct BinderHooks {
    plan_filter: Option<PlanFilter>,
    key_seed: Option<KeySeed>,
}

impl BinderHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alter the auto/restricted buckets before execution begins.
    pub fn with_plan_filter(
        mut self,
        filter: impl Fn(&mut ExecutionPlan) + Send + Sync + 'static,
    ) -> Self {
        self.plan_filter = Some(Box::new(filter));
        self
    }

    /// Transform the concatenated cache-key material before hashing, e.g. to
    /// version a deployment's whole cache namespace.
    pub fn with_key_seed(
        mut self,
        seed: impl Fn(String) -> String + Send + Sync + 'static,
    ) -> Self {
        self.key_seed = Some(Box::new(seed));
        self
    }

    pub(crate) fn apply_plan(&self, plan: &mut ExecutionPlan) {
        if let Some(filter) = &self.plan_filter {
            filter(plan);
        }
    }

    pub(crate) fn apply_key_seed(&self, material: String) -> String {
        match &self.key_seed {
            Some(seed) => seed(material),
            None => material,
        }
    }
}
