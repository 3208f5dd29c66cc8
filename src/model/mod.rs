//! The model contract and fetch orchestration.
//!
//! A [`Model`] is a data-producing unit: the binder resolves its registered
//! method catalog, invokes each eligible method, and merges the results into
//! a per-request data tree. Method bodies receive a [`BindScope`] — the only
//! surface through which they may bind values, compose submodels, or
//! terminate the fetch.

mod binder;
mod hooks;
mod scope;

pub use binder::{Binder, BinderBuilder, FetchResult};
pub use hooks::BinderHooks;
pub use scope::BindScope;

use serde_json::Value;

use crate::domain::error::BindError;

/// Execution context threaded through every fetch: ordinary in-process
/// binding, or a call arriving over the remote boundary. Never ambient
/// state — always an explicit parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallContext {
    Normal,
    Remote,
}

/// A data-producing unit.
///
/// Implementations dispatch catalog method names to their bodies. A name the
/// implementation does not answer to means registration and implementation
/// disagree; return [`BindError::unknown_method`] from the fallthrough arm.
/// Returning `Ok(None)` binds nothing under the method's data key.
pub trait Model: Send {
    fn invoke(
        &mut self,
        method: &str,
        scope: &mut BindScope<'_>,
    ) -> Result<Option<Value>, BindError>;
}
