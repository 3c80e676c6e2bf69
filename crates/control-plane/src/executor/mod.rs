//! Step executor backends.
//!
//! A [`StepExecutor`] performs the work of one step given the results of the
//! steps before it. The orchestrator never calls an executor directly; it goes
//! through [`crate::engine::StepRunner`], which turns every kind of fault into
//! a failed [`StepOutcome`].

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::models::StepSpec;
use crate::engine::ContextSnapshot;
use crate::error::AppError;

pub use http::HttpStepExecutor;

/// Result reported by an executor for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepOutcome {
    pub fn success(result: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            result,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Errors raised while talking to an executor backend.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Request could not be sent or the connection failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Backend answered with a non-success status.
    #[error("Executor returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Backend answered with a body that is not a step outcome.
    #[error("Invalid executor response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ExecutorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ExecutorError::InvalidResponse(e.to_string())
        } else {
            ExecutorError::Http(e.to_string())
        }
    }
}

impl From<ExecutorError> for AppError {
    fn from(e: ExecutorError) -> Self {
        AppError::ExternalService(e.to_string())
    }
}

/// Runs a single step.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Execute `step` with the results of all previously completed steps.
    async fn execute(
        &self,
        step: &StepSpec,
        context: &ContextSnapshot,
    ) -> Result<StepOutcome, ExecutorError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_deserializes_with_missing_fields() {
        let outcome: StepOutcome = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert_eq!(outcome, StepOutcome::success(None));

        let outcome: StepOutcome =
            serde_json::from_value(json!({"success": false, "error": "no route"})).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("no route"));
    }

    #[test]
    fn test_executor_error_maps_to_external_service() {
        let err: AppError = ExecutorError::Status {
            status: 500,
            body: "boom".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::ExternalService(ref m) if m == "Executor returned 500: boom"));
    }
}
