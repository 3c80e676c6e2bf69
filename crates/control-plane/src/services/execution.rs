//! Execution management service.
//!
//! Starts executions through the orchestrator and serves read models
//! (listing, detail, analytics) straight from the repository.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{Analytics, ExecutionDetail, ExecutionSummary};
use crate::engine::{ExecutionOrchestrator, RunStatus};
use crate::error::{AppError, AppResult};
use crate::repository::Repository;

/// Response for a started execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedExecution {
    pub execution_id: Uuid,
    pub status: RunStatus,
}

#[derive(Clone)]
pub struct ExecutionService {
    repository: Arc<dyn Repository>,
    orchestrator: ExecutionOrchestrator,
}

impl ExecutionService {
    pub fn new(repository: Arc<dyn Repository>, orchestrator: ExecutionOrchestrator) -> Self {
        Self {
            repository,
            orchestrator,
        }
    }

    /// Start running `workflow_id`. Returns once the execution row exists.
    pub async fn start(&self, workflow_id: Uuid) -> AppResult<StartedExecution> {
        let execution_id = self.orchestrator.start_execution(workflow_id).await?;
        Ok(StartedExecution {
            execution_id,
            status: RunStatus::Running,
        })
    }

    /// Executions with workflow names, newest first.
    pub async fn list(&self) -> AppResult<Vec<ExecutionSummary>> {
        self.repository.list_executions().await
    }

    /// Execution with its steps in index order.
    pub async fn get(&self, id: Uuid) -> AppResult<ExecutionDetail> {
        self.repository
            .get_execution(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Execution not found: {}", id)))
    }

    pub async fn analytics(&self) -> AppResult<Analytics> {
        self.repository.analytics().await
    }

    /// Executions whose task is still running in this process.
    pub fn active_count(&self) -> usize {
        self.orchestrator.tasks().active_count()
    }
}
