//! Error types for the AgentFlow Control Plane server.
//!
//! `AppError` is the crate-wide error. It implements `IntoResponse` so
//! handlers can return it directly; component-local errors (planner,
//! executor, notifier) convert into it at the service boundary.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level errors for the control plane.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Referenced workflow or execution does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Bad request error
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Illegal state transition (e.g. leaving a terminal state)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Planner failed or produced an unusable plan
    #[error("Planning failed: {0}")]
    Planning(String),

    /// External service error
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// NATS messaging error
    #[error("NATS error: {0}")]
    Nats(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Planning(_) | AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Nats(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                self.to_string()
            }
            AppError::Serialization(e) => {
                tracing::error!(error = %e, "Serialization error");
                self.to_string()
            }
            AppError::Planning(msg) => {
                tracing::warn!(error = %msg, "Planning failed");
                self.to_string()
            }
            AppError::ExternalService(msg) => {
                tracing::warn!(error = %msg, "External service error");
                msg.clone()
            }
            AppError::Internal(msg) | AppError::Config(msg) | AppError::Nats(msg) => {
                tracing::error!(error = %msg, "Server error");
                msg.clone()
            }
            AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::BadRequest(msg)
            | AppError::Conflict(msg) => msg.clone(),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<envy::Error> for AppError {
    fn from(err: envy::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = AppError::NotFound("workflow 42".to_string());
        assert_eq!(err.to_string(), "Resource not found: workflow 42");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_planning_error_is_bad_gateway() {
        let err = AppError::Planning("model returned prose".to_string());
        assert_eq!(err.to_string(), "Planning failed: model returned prose");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_conflict_response_status() {
        let response = AppError::Conflict("execution already completed".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
