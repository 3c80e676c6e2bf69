//! Prompt-to-plan decomposition.
//!
//! A [`Planner`] turns a natural-language goal into an ordered list of
//! [`StepSpec`]s. Planning errors only surface from workflow creation and are
//! never recorded against an execution.

pub mod http;
pub mod parser;

use async_trait::async_trait;
use thiserror::Error;

use crate::db::models::StepSpec;
use crate::error::AppError;

pub use http::HttpPlanner;
pub use parser::parse_plan;

/// Errors raised while producing a plan.
#[derive(Debug, Error)]
pub enum PlanningError {
    /// Request to the planning model failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Planning model answered with a non-success status.
    #[error("Planner returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Planning model answered without any content.
    #[error("Planner returned an empty response")]
    EmptyResponse,

    /// Response content is not a usable plan.
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// System prompt could not be rendered.
    #[error("Template error: {0}")]
    Template(String),
}

impl From<reqwest::Error> for PlanningError {
    fn from(e: reqwest::Error) -> Self {
        PlanningError::Http(e.to_string())
    }
}

impl From<minijinja::Error> for PlanningError {
    fn from(e: minijinja::Error) -> Self {
        PlanningError::Template(e.to_string())
    }
}

impl From<PlanningError> for AppError {
    fn from(e: PlanningError) -> Self {
        AppError::Planning(e.to_string())
    }
}

/// Decomposes a prompt into ordered steps.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, prompt: &str) -> Result<Vec<StepSpec>, PlanningError>;
}
