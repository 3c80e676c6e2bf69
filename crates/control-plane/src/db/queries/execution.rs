//! Execution and execution step queries.
//!
//! Status updates read the current status first and refuse illegal
//! transitions, so a terminal row is never rewritten.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::models::{
    Execution, ExecutionDetail, ExecutionRow, ExecutionStep, ExecutionStepRow, ExecutionSummary,
    StepSpec,
};
use crate::db::DbPool;
use crate::engine::RunStatus;
use crate::error::{AppError, AppResult};

/// Execution columns followed by the owning workflow's name.
type ExecutionJoinRow = (
    Uuid,
    Uuid,
    String,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    Option<String>,
    String,
);

fn split_join_row(row: ExecutionJoinRow) -> AppResult<(Execution, String)> {
    let (id, workflow_id, status, started_at, completed_at, error_message, workflow_name) = row;
    let execution = Execution::try_from(ExecutionRow {
        id,
        workflow_id,
        status,
        started_at,
        completed_at,
        error_message,
    })?;
    Ok((execution, workflow_name))
}

/// Insert a new execution row.
pub async fn insert_execution(pool: &DbPool, execution: &Execution) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO executions (id, workflow_id, status, started_at, completed_at, error_message)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(execution.id)
    .bind(execution.workflow_id)
    .bind(execution.status.as_str())
    .bind(execution.started_at)
    .bind(execution.completed_at)
    .bind(&execution.error_message)
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert a new execution step row in `Running` state.
pub async fn insert_execution_step(
    pool: &DbPool,
    execution_id: Uuid,
    step_index: i32,
    spec: &StepSpec,
) -> AppResult<ExecutionStep> {
    let row = sqlx::query_as::<_, ExecutionStepRow>(
        r#"
        INSERT INTO execution_steps (
            id, execution_id, step_index, name, agent_type, status, started_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, execution_id, step_index, name, agent_type, status,
                  result_payload, error_message, started_at, completed_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(execution_id)
    .bind(step_index)
    .bind(&spec.name)
    .bind(spec.agent_type.as_str())
    .bind(RunStatus::Running.as_str())
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    ExecutionStep::try_from(row)
}

async fn current_execution_status(pool: &DbPool, id: Uuid) -> AppResult<RunStatus> {
    let status: Option<String> =
        sqlx::query_scalar("SELECT status FROM executions WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    status
        .ok_or_else(|| AppError::NotFound(format!("Execution not found: {}", id)))?
        .parse()
        .map_err(AppError::Internal)
}

async fn current_step_status(pool: &DbPool, id: Uuid) -> AppResult<RunStatus> {
    let status: Option<String> =
        sqlx::query_scalar("SELECT status FROM execution_steps WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    status
        .ok_or_else(|| AppError::NotFound(format!("Execution step not found: {}", id)))?
        .parse()
        .map_err(AppError::Internal)
}

fn completion_time(status: RunStatus) -> Option<DateTime<Utc>> {
    status.is_terminal().then(Utc::now)
}

/// Update an execution's status and error message.
pub async fn update_execution(
    pool: &DbPool,
    id: Uuid,
    status: RunStatus,
    error: Option<&str>,
) -> AppResult<()> {
    let current = current_execution_status(pool, id).await?;
    if !current.can_transition_to(status) {
        return Err(AppError::Conflict(format!(
            "Execution {} cannot move from {} to {}",
            id, current, status
        )));
    }

    let result = sqlx::query(
        r#"
        UPDATE executions
        SET status = $3,
            error_message = COALESCE($4, error_message),
            completed_at = COALESCE($5, completed_at)
        WHERE id = $1 AND status = $2
        "#,
    )
    .bind(id)
    .bind(current.as_str())
    .bind(status.as_str())
    .bind(error)
    .bind(completion_time(status))
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict(format!(
            "Execution {} changed status concurrently",
            id
        )));
    }

    Ok(())
}

/// Update an execution step's status, result payload and error message.
pub async fn update_execution_step(
    pool: &DbPool,
    id: Uuid,
    status: RunStatus,
    result: Option<&serde_json::Value>,
    error: Option<&str>,
) -> AppResult<()> {
    let current = current_step_status(pool, id).await?;
    if !current.can_transition_to(status) {
        return Err(AppError::Conflict(format!(
            "Execution step {} cannot move from {} to {}",
            id, current, status
        )));
    }

    let updated = sqlx::query(
        r#"
        UPDATE execution_steps
        SET status = $3,
            result_payload = COALESCE($4, result_payload),
            error_message = COALESCE($5, error_message),
            completed_at = COALESCE($6, completed_at)
        WHERE id = $1 AND status = $2
        "#,
    )
    .bind(id)
    .bind(current.as_str())
    .bind(status.as_str())
    .bind(result)
    .bind(error)
    .bind(completion_time(status))
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::Conflict(format!(
            "Execution step {} changed status concurrently",
            id
        )));
    }

    Ok(())
}

/// Get an execution with its workflow name and ordered steps.
pub async fn get_execution_detail(pool: &DbPool, id: Uuid) -> AppResult<Option<ExecutionDetail>> {
    let row: Option<ExecutionJoinRow> =
        sqlx::query_as(
            r#"
            SELECT e.id, e.workflow_id, e.status, e.started_at, e.completed_at,
                   e.error_message, w.name
            FROM executions e
            JOIN workflows w ON w.id = e.workflow_id
            WHERE e.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let (execution, workflow_name) = split_join_row(row)?;

    let step_rows = sqlx::query_as::<_, ExecutionStepRow>(
        r#"
        SELECT id, execution_id, step_index, name, agent_type, status,
               result_payload, error_message, started_at, completed_at
        FROM execution_steps
        WHERE execution_id = $1
        ORDER BY step_index ASC
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let steps = step_rows
        .into_iter()
        .map(ExecutionStep::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Some(ExecutionDetail {
        execution,
        workflow_name,
        steps,
    }))
}

/// List executions with their workflow names, newest first.
pub async fn list_executions(pool: &DbPool) -> AppResult<Vec<ExecutionSummary>> {
    let rows: Vec<ExecutionJoinRow> =
        sqlx::query_as(
            r#"
            SELECT e.id, e.workflow_id, e.status, e.started_at, e.completed_at,
                   e.error_message, w.name
            FROM executions e
            JOIN workflows w ON w.id = e.workflow_id
            ORDER BY e.started_at DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

    rows.into_iter()
        .map(|row| {
            let (execution, workflow_name) = split_join_row(row)?;
            Ok(ExecutionSummary {
                execution,
                workflow_name,
            })
        })
        .collect()
}
