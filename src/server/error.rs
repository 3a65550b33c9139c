use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Request-fatal errors. Provider failures never reach this type; they are
/// recovered per symbol inside the refresh path. Only storage failures
/// escalate, as a 500 with a uniform JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    timestamp: i64,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError::Storage(ref e) = self;
        error!("request failed: {:#}", e);

        let body = ErrorBody {
            code: "STORAGE_ERROR",
            message: self.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
