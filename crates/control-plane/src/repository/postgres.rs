//! PostgreSQL repository backed by the `db::queries` functions.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::db::models::{
    Analytics, Execution, ExecutionDetail, ExecutionStep, ExecutionSummary, NewWorkflow, StepSpec,
    WorkflowPlan,
};
use crate::db::{pool, queries, DbPool};
use crate::engine::RunStatus;
use crate::error::AppResult;

use super::Repository;

/// Repository over a shared PostgreSQL pool.
#[derive(Clone)]
pub struct PgRepository {
    db: DbPool,
}

impl PgRepository {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn create_workflow(&self, workflow: NewWorkflow) -> AppResult<WorkflowPlan> {
        let plan = workflow.into_plan();
        queries::workflow::insert_workflow(&self.db, &plan).await?;
        tracing::debug!(workflow_id = %plan.id, steps = plan.steps.len(), "Workflow stored");
        Ok(plan)
    }

    async fn get_workflow(&self, id: Uuid) -> AppResult<Option<WorkflowPlan>> {
        queries::workflow::get_workflow(&self.db, id).await
    }

    async fn list_workflows(&self) -> AppResult<Vec<WorkflowPlan>> {
        queries::workflow::list_workflows(&self.db).await
    }

    async fn create_execution(&self, workflow_id: Uuid) -> AppResult<Execution> {
        let execution = Execution {
            id: Uuid::new_v4(),
            workflow_id,
            status: RunStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            error_message: None,
        };
        queries::execution::insert_execution(&self.db, &execution).await?;
        Ok(execution)
    }

    async fn create_execution_step(
        &self,
        execution_id: Uuid,
        index: i32,
        spec: &StepSpec,
    ) -> AppResult<ExecutionStep> {
        queries::execution::insert_execution_step(&self.db, execution_id, index, spec).await
    }

    async fn update_execution_step(
        &self,
        id: Uuid,
        status: RunStatus,
        result: Option<&serde_json::Value>,
        error: Option<&str>,
    ) -> AppResult<()> {
        queries::execution::update_execution_step(&self.db, id, status, result, error).await
    }

    async fn update_execution(
        &self,
        id: Uuid,
        status: RunStatus,
        error: Option<&str>,
    ) -> AppResult<()> {
        queries::execution::update_execution(&self.db, id, status, error).await
    }

    async fn get_execution(&self, id: Uuid) -> AppResult<Option<ExecutionDetail>> {
        queries::execution::get_execution_detail(&self.db, id).await
    }

    async fn list_executions(&self) -> AppResult<Vec<ExecutionSummary>> {
        queries::execution::list_executions(&self.db).await
    }

    async fn analytics(&self) -> AppResult<Analytics> {
        queries::analytics::analytics(&self.db).await
    }

    async fn health(&self) -> bool {
        pool::health_check(&self.db).await
    }
}
