//! Mapping from core errors to HTTP responses

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use wallet_core::{Error, ErrorClass};

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

/// Error returned from a handler
#[derive(Debug)]
pub enum ApiError {
    /// The request could not be parsed (bad JSON, non-UUID id)
    BadRequest(String),
    Core(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Core(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(format!("invalid wallet id: {}", rejection.body_text()))
    }
}

/// Response status for a core error
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::AlreadyExists(_) | Error::VersionConflict { .. } => StatusCode::CONFLICT,
        Error::RetriesExhausted { .. } | Error::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
        Error::DeadlineExceeded { .. } => StatusCode::GATEWAY_TIMEOUT,
        other if other.is_client_fault() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: message,
                    code: "INVALID_REQUEST",
                },
            ),
            ApiError::Core(err) => {
                let status = status_for(&err);
                if matches!(err.class(), ErrorClass::Infrastructure | ErrorClass::Contention) {
                    tracing::error!(code = err.code(), error = %err, "request failed");
                }
                (
                    status,
                    ErrorBody {
                        error: err.public_message(),
                        code: err.code(),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
