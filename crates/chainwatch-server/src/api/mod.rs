use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub mod alerts;
pub mod dashboard;
pub mod suppliers;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

pub fn error_response(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(ApiError {
            error: error.to_string(),
            message: message.to_string(),
        }),
    )
        .into_response()
}

pub fn storage_error(e: anyhow::Error) -> Response {
    tracing::error!(error = %e, "Storage query failed");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "storage_error",
        "Database error",
    )
}

pub fn not_found(what: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, "not_found", what)
}

/// Default page size for list endpoints.
pub fn resolve_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(20).min(500)
}

pub fn resolve_offset(offset: Option<usize>) -> usize {
    offset.unwrap_or(0)
}
