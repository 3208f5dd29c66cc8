//! The surface a method body sees while it runs.

use serde_json::Value;

use crate::cache::SubCall;
use crate::domain::args::ModelArgs;
use crate::domain::error::BindError;
use crate::domain::tree::DataTree;

use super::CallContext;
use super::binder::{Binder, NodeState, RunOptions};

/// Mutable view over one model's fetch, handed to each method invocation.
///
/// Everything a body may do — bind values, compose submodels, terminate the
/// cycle — goes through here; the tree is never reachable any other way.
pub struct BindScope<'a> {
    binder: &'a Binder,
    node: &'a mut NodeState,
    tree: &'a mut DataTree,
    context: CallContext,
    use_cache: bool,
}

impl<'a> BindScope<'a> {
    pub(crate) fn new(
        binder: &'a Binder,
        node: &'a mut NodeState,
        tree: &'a mut DataTree,
        context: CallContext,
        use_cache: bool,
    ) -> Self {
        Self {
            binder,
            node,
            tree,
            context,
            use_cache,
        }
    }

    /// This model's logical identity (registered name unless renamed).
    pub fn identity(&self) -> &str {
        &self.node.identity
    }

    pub fn args(&self) -> &ModelArgs {
        &self.node.args
    }

    /// Ancestor identities, root first. Empty when this model is the root.
    pub fn ancestors(&self) -> &[String] {
        &self.node.path
    }

    pub fn is_sub(&self) -> bool {
        self.node.is_sub()
    }

    pub fn context(&self) -> CallContext {
        self.context
    }

    /// Stop this fetch cycle after the current method returns. Cooperative:
    /// propagates upward through the parent chain, never downward.
    pub fn terminate(&mut self) {
        self.node.terminated = true;
    }

    pub fn terminated(&self) -> bool {
        self.node.terminated
    }

    /// Attach a value under `key` in this model's entry (merge rules per
    /// `DataTree::bind`).
    pub fn bind(&mut self, key: &str, value: Value) -> Result<(), BindError> {
        self.tree.bind(&self.node.identity, key, value)
    }

    /// Attach a value under `key` in another model's entry.
    pub fn bind_to(&mut self, target: &str, key: &str, value: Value) -> Result<(), BindError> {
        self.tree.bind_to(target, key, value)
    }

    /// Compose a child model: construct it, run its fetch, and merge its
    /// entry into this tree. Recorded for cache replay.
    pub fn bind_sub(&mut self, model: &str, args: ModelArgs) -> Result<(), BindError> {
        self.bind_sub_inner(model, None, args, true, self.use_cache)
    }

    /// `bind_sub` under an explicit child identity.
    pub fn bind_sub_as(
        &mut self,
        model: &str,
        identity: &str,
        args: ModelArgs,
    ) -> Result<(), BindError> {
        self.bind_sub_inner(model, Some(identity), args, true, self.use_cache)
    }

    /// Replay a recorded submodel call after a cache hit: no re-recording,
    /// and caching stays disabled for the whole replayed subtree.
    pub(crate) fn bind_sub_replay(&mut self, sub: &SubCall) -> Result<(), BindError> {
        self.bind_sub_inner(&sub.model, sub.identity.as_deref(), sub.args.clone(), false, false)
    }

    fn bind_sub_inner(
        &mut self,
        model: &str,
        identity: Option<&str>,
        args: ModelArgs,
        record: bool,
        use_cache: bool,
    ) -> Result<(), BindError> {
        let spec = self
            .binder
            .registry()
            .get(model)
            .ok_or_else(|| BindError::unknown_model(model))?;

        let limit = self.binder.max_bind_depth();
        if self.node.depth() + 1 > limit {
            return Err(BindError::DepthExceeded { limit });
        }

        if record {
            self.node.called_submodels.push(SubCall {
                model: model.to_string(),
                identity: identity.map(str::to_string),
                args: args.clone(),
            });
        }

        let child_identity = identity.unwrap_or(spec.name()).to_string();
        let mut path = self.node.path.clone();
        path.push(self.node.identity.clone());

        let child = NodeState::new(child_identity.clone(), args, path);
        let run = self.binder.run_node(
            spec,
            child,
            RunOptions {
                functions: None,
                tidy: false,
                context: self.context,
                use_cache,
            },
        )?;

        let mut child_tree = run.tree;
        let data = child_tree.take_root(&child_identity);
        if self.node.is_sub() {
            self.tree.merge_nested(&self.node.identity, &child_identity, data);
        } else {
            self.tree.merge_root(&child_identity, data);
        }

        if run.terminated {
            self.node.terminated = true;
        }
        Ok(())
    }
}
