//! Workflow API handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::db::models::WorkflowPlan;
use crate::error::AppError;
use crate::services::{CreateWorkflowRequest, ExecutionService, StartedExecution, WorkflowService};

/// Create a workflow from a prompt, or from an explicit step list.
///
/// POST /api/workflows
///
/// A body that is not a valid request is a `400` with the usual error body.
pub async fn create(
    State(service): State<WorkflowService>,
    payload: Result<Json<CreateWorkflowRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<WorkflowPlan>), AppError> {
    let Json(request) = payload?;
    let plan = service.create(request).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// GET /api/workflows
pub async fn list(
    State(service): State<WorkflowService>,
) -> Result<Json<Vec<WorkflowPlan>>, AppError> {
    Ok(Json(service.list().await?))
}

/// GET /api/workflows/{id}
pub async fn get(
    State(service): State<WorkflowService>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkflowPlan>, AppError> {
    Ok(Json(service.get(id).await?))
}

/// Start an execution. Returns as soon as the execution exists; steps run
/// in the background.
///
/// POST /api/workflows/{id}/execute
pub async fn execute(
    State(service): State<ExecutionService>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<StartedExecution>), AppError> {
    let started = service.start(id).await?;
    Ok((StatusCode::ACCEPTED, Json(started)))
}
