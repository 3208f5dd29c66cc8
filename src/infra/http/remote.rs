//! Remote invocation handler.
//!
//! Accepts a target model type, an argument bag, and an explicit list of
//! method names; responds with either the full tidy value map or an
//! `{error}` body — never partial data next to an error.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::Value;
use tracing::error;
use trama_api_types::{RemoteErrorBody, RemoteInvokeRequest};

use crate::domain::args::ModelArgs;
use crate::domain::error::BindError;
use crate::model::Binder;

/// Shared state for the remote boundary.
#[derive(Clone)]
pub struct RemoteState {
    pub binder: Arc<Binder>,
}

/// Build the mountable remote-invocation router.
pub fn remote_router(state: RemoteState) -> Router {
    Router::new()
        .route("/remote/v1/invoke", post(invoke))
        .with_state(state)
}

async fn invoke(
    State(state): State<RemoteState>,
    Json(request): Json<RemoteInvokeRequest>,
) -> Response {
    if request.functions.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "at least one function must be requested",
        );
    }

    // The fetch traversal is synchronous by design; keep it off the async
    // runtime's worker threads.
    let binder = state.binder.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let args = ModelArgs::from_map(request.args);
        binder.invoke_remote(&request.model, args, &request.functions)
    })
    .await;

    match outcome {
        Ok(Ok(values)) => (StatusCode::OK, Json(Value::Object(values))).into_response(),
        Ok(Err(err)) => bind_error_response(err),
        Err(join_err) => {
            error!(error = %join_err, "Remote invocation worker failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "invocation worker failed",
            )
        }
    }
}

fn bind_error_response(err: BindError) -> Response {
    let status = match &err {
        BindError::UnknownModel { .. } => StatusCode::NOT_FOUND,
        BindError::UnknownMethod { .. }
        | BindError::NotCallable { .. }
        | BindError::InvalidArguments { .. }
        | BindError::MissingBindKey => StatusCode::BAD_REQUEST,
        BindError::NotAuthorized { .. } => StatusCode::FORBIDDEN,
        BindError::DepthExceeded { .. } | BindError::Method { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, err.to_string())
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(RemoteErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}
