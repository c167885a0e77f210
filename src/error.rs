use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::engine::EngineError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Requested match or team was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A theme pool has nothing to draw from.
    #[error("content exhausted: {0}")]
    ContentExhausted(String),
    /// The change was applied but could not be persisted.
    #[error("failed to persist tournament state")]
    Persistence(#[source] StorageError),
    /// Unexpected failure unrelated to the request.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<EngineError> for ServiceError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::MatchNotFound(_) | EngineError::TeamNotFound(_) => {
                ServiceError::NotFound(err.to_string())
            }
            EngineError::InvalidState(message) => ServiceError::InvalidState(message),
            EngineError::InvalidInput(message) => ServiceError::InvalidInput(message),
            EngineError::ContentExhausted(_) => ServiceError::ContentExhausted(err.to_string()),
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Persistence(err)
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Request understood but there is nothing to serve it with.
    #[error("unprocessable: {0}")]
    Unprocessable(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::ContentExhausted(message) => AppError::Unprocessable(message),
            ServiceError::Persistence(source) => AppError::ServiceUnavailable(format!(
                "change applied but not saved: {source}"
            )),
            ServiceError::Internal(message) => AppError::Internal(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::state::tournament::Theme;

    fn status_of(err: ServiceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn engine_errors_map_to_http_statuses() {
        let cases = [
            (
                EngineError::MatchNotFound("qf9".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                EngineError::TeamNotFound(Uuid::nil()),
                StatusCode::NOT_FOUND,
            ),
            (
                EngineError::InvalidState("not ready".into()),
                StatusCode::CONFLICT,
            ),
            (
                EngineError::InvalidInput("bad side".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                EngineError::ContentExhausted(Theme::Emoji),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(status_of(err.into()), expected);
        }
    }

    #[test]
    fn persistence_failure_is_service_unavailable() {
        let err = StorageError::unavailable(
            "writing state".into(),
            std::io::Error::other("disk full"),
        );
        assert_eq!(status_of(err.into()), StatusCode::SERVICE_UNAVAILABLE);
    }
}
