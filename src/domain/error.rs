use thiserror::Error;

/// Fatal binding errors.
///
/// Everything here terminates the current fetch cycle immediately. Cache
/// failures never surface through this type; the caching layer degrades to a
/// miss and the underlying method still runs (see `cache::method`).
#[derive(Debug, Error)]
pub enum BindError {
    #[error("`bind` requires a non-empty key")]
    MissingBindKey,
    #[error("model type `{name}` is not registered")]
    UnknownModel { name: String },
    #[error("method `{method}` does not exist in the catalog of `{model}`")]
    UnknownMethod { model: String, method: String },
    #[error("method `{method}` of `{model}` takes arguments and cannot run from a function list")]
    NotCallable { model: String, method: String },
    #[error("method `{method}` of `{model}` is not allowed in this context")]
    NotAuthorized { model: String, method: String },
    #[error("model arguments must be a JSON object, got {kind}")]
    InvalidArguments { kind: &'static str },
    #[error("submodel nesting exceeded the configured depth limit of {limit}")]
    DepthExceeded { limit: usize },
    #[error("method `{method}` of `{model}` failed: {message}")]
    Method {
        model: String,
        method: String,
        message: String,
    },
}

impl BindError {
    pub fn unknown_model(name: impl Into<String>) -> Self {
        Self::UnknownModel { name: name.into() }
    }

    pub fn unknown_method(model: impl Into<String>, method: impl Into<String>) -> Self {
        Self::UnknownMethod {
            model: model.into(),
            method: method.into(),
        }
    }

    pub fn not_callable(model: impl Into<String>, method: impl Into<String>) -> Self {
        Self::NotCallable {
            model: model.into(),
            method: method.into(),
        }
    }

    pub fn not_authorized(model: impl Into<String>, method: impl Into<String>) -> Self {
        Self::NotAuthorized {
            model: model.into(),
            method: method.into(),
        }
    }

    pub fn method(
        model: impl Into<String>,
        method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Method {
            model: model.into(),
            method: method.into(),
            message: message.into(),
        }
    }
}
