//! Aggregate execution statistics.

use crate::db::models::Analytics;
use crate::db::queries::workflow::count_workflows;
use crate::db::DbPool;
use crate::engine::RunStatus;
use crate::error::{AppError, AppResult};

/// Count executions per status.
pub async fn execution_status_counts(pool: &DbPool) -> AppResult<Vec<(RunStatus, i64)>> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM executions GROUP BY status")
            .fetch_all(pool)
            .await?;

    rows.into_iter()
        .map(|(status, count)| {
            let status: RunStatus = status.parse().map_err(AppError::Internal)?;
            Ok((status, count))
        })
        .collect()
}

/// Workflow count, execution count, success rate and status histogram.
pub async fn analytics(pool: &DbPool) -> AppResult<Analytics> {
    let total_workflows = count_workflows(pool).await?;
    let counts = execution_status_counts(pool).await?;
    Ok(Analytics::from_counts(total_workflows, &counts))
}
