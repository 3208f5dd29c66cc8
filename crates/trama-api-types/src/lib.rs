//! Shared wire types for the trama remote invocation API.
//!
//! External automation clients depend on this crate instead of the engine
//! itself, so the request/response shapes stay stable and dependency-light.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request body for `POST /remote/v1/invoke`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteInvokeRequest {
    /// Registered model type to instantiate.
    pub model: String,
    /// Construction arguments forwarded to the model.
    #[serde(default)]
    pub args: Map<String, Value>,
    /// Catalog methods to run. The boundary rejects an empty list.
    #[serde(default)]
    pub functions: Vec<String>,
}

impl RemoteInvokeRequest {
    pub fn new(model: impl Into<String>, functions: Vec<String>) -> Self {
        Self {
            model: model.into(),
            args: Map::new(),
            functions,
        }
    }
}

/// Successful invocation response: derived data key → bound value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteInvokeResponse {
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

/// Error body shared by every failed remote invocation.
///
/// The boundary never returns partial data next to an error; a response is
/// either the full value map or this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_args_and_functions() {
        let request: RemoteInvokeRequest =
            serde_json::from_str(r#"{"model": "Page"}"#).expect("minimal request");
        assert_eq!(request.model, "Page");
        assert!(request.args.is_empty());
        assert!(request.functions.is_empty());
    }

    #[test]
    fn response_flattens_values() {
        let mut values = Map::new();
        values.insert("content".to_string(), Value::String("hi".to_string()));
        let body = serde_json::to_value(RemoteInvokeResponse { values }).expect("serialize");
        assert_eq!(body["content"], "hi");
    }

    #[test]
    fn error_body_round_trips() {
        let body = RemoteErrorBody {
            error: "model type `Nope` is not registered".to_string(),
        };
        let json = serde_json::to_string(&body).expect("serialize");
        assert!(json.contains("\"error\""));
        let back: RemoteErrorBody = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.error, body.error);
    }
}
