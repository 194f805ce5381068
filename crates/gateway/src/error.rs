use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

/// A handler failure, reported as `500 { "error": <message> }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Request(#[from] JsonRejection),

    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    #[error(transparent)]
    Tool(#[from] runtime::ToolError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        warn!(error = %message, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": message })),
        )
            .into_response()
    }
}
