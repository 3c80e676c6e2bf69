//! Workflow plan queries.

use uuid::Uuid;

use crate::db::models::{WorkflowPlan, WorkflowRow};
use crate::db::DbPool;
use crate::error::AppResult;

/// Insert a new workflow plan.
pub async fn insert_workflow(pool: &DbPool, plan: &WorkflowPlan) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO workflows (id, name, description, original_prompt, steps, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(plan.id)
    .bind(&plan.name)
    .bind(&plan.description)
    .bind(&plan.original_prompt)
    .bind(sqlx::types::Json(&plan.steps))
    .bind(plan.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a workflow plan by ID.
pub async fn get_workflow(pool: &DbPool, id: Uuid) -> AppResult<Option<WorkflowPlan>> {
    let row = sqlx::query_as::<_, WorkflowRow>(
        r#"
        SELECT id, name, description, original_prompt, steps, created_at
        FROM workflows
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(WorkflowPlan::from))
}

/// List all workflow plans, newest first.
pub async fn list_workflows(pool: &DbPool) -> AppResult<Vec<WorkflowPlan>> {
    let rows = sqlx::query_as::<_, WorkflowRow>(
        r#"
        SELECT id, name, description, original_prompt, steps, created_at
        FROM workflows
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(WorkflowPlan::from).collect())
}

/// Count stored workflow plans.
pub async fn count_workflows(pool: &DbPool) -> AppResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workflows")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
