use crate::coordinator::CoordinatorError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Coordinator(#[from] CoordinatorError),

    #[error("{}", .0.join(" "))]
    Validation(Vec<String>),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0} not found")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::Coordinator(e) if e.is_not_found() => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            ApiError::Coordinator(CoordinatorError::AlreadyInProgress(_)) => {
                (StatusCode::CONFLICT, "ALREADY_IN_PROGRESS")
            }
            ApiError::Coordinator(_) => (StatusCode::BAD_REQUEST, "COORDINATOR_ERROR"),
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_FAILED"),
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        };

        let body = Json(json!({
            "error": self.to_string(),
            "code": error_code,
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
