//! In-process repository.
//!
//! Used with `AGENTFLOW_STORE=memory` and throughout the test suite. State is
//! lost when the process exits.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::{
    Analytics, Execution, ExecutionDetail, ExecutionStep, ExecutionSummary, NewWorkflow, StepSpec,
    WorkflowPlan,
};
use crate::engine::RunStatus;
use crate::error::{AppError, AppResult};

use super::Repository;

#[derive(Default)]
struct Tables {
    // insertion order, oldest first
    workflows: Vec<WorkflowPlan>,
    executions: Vec<Execution>,
    steps: Vec<ExecutionStep>,
}

impl Tables {
    fn workflow_name(&self, id: Uuid) -> String {
        self.workflows
            .iter()
            .find(|w| w.id == id)
            .map(|w| w.name.clone())
            .unwrap_or_default()
    }
}

/// Repository held entirely in memory.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_workflow(&self, workflow: NewWorkflow) -> AppResult<WorkflowPlan> {
        let plan = workflow.into_plan();
        self.tables.write().await.workflows.push(plan.clone());
        Ok(plan)
    }

    async fn get_workflow(&self, id: Uuid) -> AppResult<Option<WorkflowPlan>> {
        let tables = self.tables.read().await;
        Ok(tables.workflows.iter().find(|w| w.id == id).cloned())
    }

    async fn list_workflows(&self) -> AppResult<Vec<WorkflowPlan>> {
        let tables = self.tables.read().await;
        Ok(tables.workflows.iter().rev().cloned().collect())
    }

    async fn create_execution(&self, workflow_id: Uuid) -> AppResult<Execution> {
        let mut tables = self.tables.write().await;
        if !tables.workflows.iter().any(|w| w.id == workflow_id) {
            return Err(AppError::NotFound(format!("Workflow not found: {}", workflow_id)));
        }

        let execution = Execution {
            id: Uuid::new_v4(),
            workflow_id,
            status: RunStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            error_message: None,
        };
        tables.executions.push(execution.clone());
        Ok(execution)
    }

    async fn create_execution_step(
        &self,
        execution_id: Uuid,
        index: i32,
        spec: &StepSpec,
    ) -> AppResult<ExecutionStep> {
        let mut tables = self.tables.write().await;
        if !tables.executions.iter().any(|e| e.id == execution_id) {
            return Err(AppError::NotFound(format!("Execution not found: {}", execution_id)));
        }
        if tables
            .steps
            .iter()
            .any(|s| s.execution_id == execution_id && s.step_index == index)
        {
            return Err(AppError::Conflict(format!(
                "Step {} already exists for execution {}",
                index, execution_id
            )));
        }

        let step = ExecutionStep {
            id: Uuid::new_v4(),
            execution_id,
            step_index: index,
            name: spec.name.clone(),
            agent_type: spec.agent_type,
            status: RunStatus::Running,
            result_payload: None,
            error_message: None,
            started_at: Some(Utc::now()),
            completed_at: None,
        };
        tables.steps.push(step.clone());
        Ok(step)
    }

    async fn update_execution_step(
        &self,
        id: Uuid,
        status: RunStatus,
        result: Option<&serde_json::Value>,
        error: Option<&str>,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let step = tables
            .steps
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Execution step not found: {}", id)))?;

        if !step.status.can_transition_to(status) {
            return Err(AppError::Conflict(format!(
                "Execution step {} cannot move from {} to {}",
                id, step.status, status
            )));
        }

        step.status = status;
        if let Some(result) = result {
            step.result_payload = Some(result.clone());
        }
        if let Some(error) = error {
            step.error_message = Some(error.to_string());
        }
        if status.is_terminal() {
            step.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn update_execution(
        &self,
        id: Uuid,
        status: RunStatus,
        error: Option<&str>,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let execution = tables
            .executions
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Execution not found: {}", id)))?;

        if !execution.status.can_transition_to(status) {
            return Err(AppError::Conflict(format!(
                "Execution {} cannot move from {} to {}",
                id, execution.status, status
            )));
        }

        execution.status = status;
        if let Some(error) = error {
            execution.error_message = Some(error.to_string());
        }
        if status.is_terminal() {
            execution.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn get_execution(&self, id: Uuid) -> AppResult<Option<ExecutionDetail>> {
        let tables = self.tables.read().await;
        let Some(execution) = tables.executions.iter().find(|e| e.id == id).cloned() else {
            return Ok(None);
        };

        let mut steps: Vec<ExecutionStep> = tables
            .steps
            .iter()
            .filter(|s| s.execution_id == id)
            .cloned()
            .collect();
        steps.sort_by_key(|s| s.step_index);

        Ok(Some(ExecutionDetail {
            workflow_name: tables.workflow_name(execution.workflow_id),
            execution,
            steps,
        }))
    }

    async fn list_executions(&self) -> AppResult<Vec<ExecutionSummary>> {
        let tables = self.tables.read().await;
        Ok(tables
            .executions
            .iter()
            .rev()
            .map(|execution| ExecutionSummary {
                workflow_name: tables.workflow_name(execution.workflow_id),
                execution: execution.clone(),
            })
            .collect())
    }

    async fn analytics(&self) -> AppResult<Analytics> {
        let tables = self.tables.read().await;
        let counts: Vec<(RunStatus, i64)> = RunStatus::ALL
            .iter()
            .map(|status| {
                let n = tables
                    .executions
                    .iter()
                    .filter(|e| e.status == *status)
                    .count();
                (*status, n as i64)
            })
            .collect();
        Ok(Analytics::from_counts(tables.workflows.len() as i64, &counts))
    }

    async fn health(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::AgentType;
    use serde_json::json;

    fn new_workflow(name: &str) -> NewWorkflow {
        NewWorkflow {
            name: name.to_string(),
            description: String::new(),
            original_prompt: format!("do {}", name),
            steps: vec![
                StepSpec::new("A", AgentType::Data, "collect"),
                StepSpec::new("B", AgentType::Communication, "send"),
            ],
        }
    }

    #[tokio::test]
    async fn test_create_execution_for_unknown_workflow_fails() {
        let repo = MemoryRepository::new();
        let err = repo.create_execution(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(repo.list_executions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_terminal_execution_rejects_updates() {
        let repo = MemoryRepository::new();
        let plan = repo.create_workflow(new_workflow("digest")).await.unwrap();
        let execution = repo.create_execution(plan.id).await.unwrap();
        assert_eq!(execution.status, RunStatus::Running);

        repo.update_execution(execution.id, RunStatus::Completed, None)
            .await
            .unwrap();
        let err = repo
            .update_execution(execution.id, RunStatus::Failed, Some("late"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let detail = repo.get_execution(execution.id).await.unwrap().unwrap();
        assert_eq!(detail.execution.status, RunStatus::Completed);
        assert!(detail.execution.completed_at.is_some());
        assert!(detail.execution.error_message.is_none());
    }

    #[tokio::test]
    async fn test_steps_are_returned_in_index_order() {
        let repo = MemoryRepository::new();
        let plan = repo.create_workflow(new_workflow("digest")).await.unwrap();
        let execution = repo.create_execution(plan.id).await.unwrap();

        let first = repo
            .create_execution_step(execution.id, 0, &plan.steps[0])
            .await
            .unwrap();
        repo.update_execution_step(first.id, RunStatus::Completed, Some(&json!({"rows": 3})), None)
            .await
            .unwrap();
        repo.create_execution_step(execution.id, 1, &plan.steps[1])
            .await
            .unwrap();

        let detail = repo.get_execution(execution.id).await.unwrap().unwrap();
        assert_eq!(detail.workflow_name, "digest");
        let indexes: Vec<i32> = detail.steps.iter().map(|s| s.step_index).collect();
        assert_eq!(indexes, vec![0, 1]);
        assert_eq!(detail.steps[0].result_payload, Some(json!({"rows": 3})));
        assert_eq!(detail.steps[1].status, RunStatus::Running);
    }

    #[tokio::test]
    async fn test_duplicate_step_index_is_conflict() {
        let repo = MemoryRepository::new();
        let plan = repo.create_workflow(new_workflow("digest")).await.unwrap();
        let execution = repo.create_execution(plan.id).await.unwrap();

        repo.create_execution_step(execution.id, 0, &plan.steps[0])
            .await
            .unwrap();
        let err = repo
            .create_execution_step(execution.id, 0, &plan.steps[0])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_listing_is_newest_first_with_workflow_names() {
        let repo = MemoryRepository::new();
        let first = repo.create_workflow(new_workflow("first")).await.unwrap();
        let second = repo.create_workflow(new_workflow("second")).await.unwrap();

        let workflows = repo.list_workflows().await.unwrap();
        assert_eq!(workflows[0].id, second.id);
        assert_eq!(workflows[1].id, first.id);

        repo.create_execution(first.id).await.unwrap();
        repo.create_execution(second.id).await.unwrap();
        let executions = repo.list_executions().await.unwrap();
        assert_eq!(executions[0].workflow_name, "second");
        assert_eq!(executions[1].workflow_name, "first");
    }

    #[tokio::test]
    async fn test_analytics_counts() {
        let repo = MemoryRepository::new();
        let plan = repo.create_workflow(new_workflow("digest")).await.unwrap();
        let ok = repo.create_execution(plan.id).await.unwrap();
        let bad = repo.create_execution(plan.id).await.unwrap();
        repo.create_execution(plan.id).await.unwrap();

        repo.update_execution(ok.id, RunStatus::Completed, None).await.unwrap();
        repo.update_execution(bad.id, RunStatus::Failed, Some("boom"))
            .await
            .unwrap();

        let analytics = repo.analytics().await.unwrap();
        assert_eq!(analytics.total_workflows, 1);
        assert_eq!(analytics.total_executions, 3);
        assert_eq!(analytics.success_rate, 33);
        assert_eq!(analytics.status_counts["running"], 1);
    }
}
