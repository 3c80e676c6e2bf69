//! Execution API handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::db::models::{Analytics, ExecutionDetail, ExecutionSummary};
use crate::error::AppError;
use crate::services::ExecutionService;

/// List executions, newest first.
///
/// GET /api/executions
pub async fn list(
    State(service): State<ExecutionService>,
) -> Result<Json<Vec<ExecutionSummary>>, AppError> {
    Ok(Json(service.list().await?))
}

/// Get an execution with its steps.
///
/// GET /api/executions/{id}
pub async fn get(
    State(service): State<ExecutionService>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExecutionDetail>, AppError> {
    Ok(Json(service.get(id).await?))
}

/// GET /api/analytics
pub async fn analytics(
    State(service): State<ExecutionService>,
) -> Result<Json<Analytics>, AppError> {
    Ok(Json(service.analytics().await?))
}
