//! Error handlers
//!
//! Maps error kinds to HTTP status codes and renders them as JSON responses.

use axum::Json;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, warn};
use serde_json::json;

use crate::error::types::StorageError;

/// Convert an error kind to its HTTP status code.
pub fn status_code(err: &StorageError) -> StatusCode {
    match err {
        StorageError::AccessDenied(_) => StatusCode::FORBIDDEN,
        StorageError::NotFound(_) => StatusCode::NOT_FOUND,
        StorageError::AlreadyExists(_) => StatusCode::CONFLICT,
        StorageError::NotEmpty(_) => StatusCode::INTERNAL_SERVER_ERROR,
        StorageError::InvalidName(_) => StatusCode::BAD_REQUEST,
        StorageError::NotADirectory(_) => StatusCode::BAD_REQUEST,
        StorageError::InvalidOperation(_) => StatusCode::BAD_REQUEST,
        StorageError::BadRequest(_) => StatusCode::BAD_REQUEST,
        StorageError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        StorageError::Archive(_) => StatusCode::INTERNAL_SERVER_ERROR,
        StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Log an error at a level that matches who is at fault.
pub fn handle_error(err: &StorageError) {
    let status = status_code(err);
    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else if status == StatusCode::FORBIDDEN {
        warn!("Request rejected: {}", err);
    }
}

impl IntoResponse for StorageError {
    fn into_response(self) -> Response {
        handle_error(&self);
        let status = status_code(&self);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<MultipartError> for StorageError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            StorageError::PayloadTooLarge(err.body_text())
        } else {
            StorageError::BadRequest(err.body_text())
        }
    }
}

impl From<MultipartRejection> for StorageError {
    fn from(rejection: MultipartRejection) -> Self {
        StorageError::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for StorageError {
    fn from(rejection: JsonRejection) -> Self {
        StorageError::BadRequest(rejection.body_text())
    }
}
