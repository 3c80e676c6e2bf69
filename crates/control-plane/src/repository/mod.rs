//! Persistence contract used by the orchestrator and services.
//!
//! The repository is the single source of truth for workflows, executions
//! and execution steps. Every row is written by exactly one execution task,
//! so implementations need no row-level locking, but they must be safe to
//! share across tasks.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::models::{
    Analytics, Execution, ExecutionDetail, ExecutionStep, ExecutionSummary, NewWorkflow, StepSpec,
    WorkflowPlan,
};
use crate::engine::RunStatus;
use crate::error::AppResult;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

/// Storage operations for plans and their executions.
///
/// Status updates on a row that is already `Completed` or `Failed` must fail
/// with `AppError::Conflict`; terminal updates stamp `completed_at`.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Store a new plan.
    async fn create_workflow(&self, workflow: NewWorkflow) -> AppResult<WorkflowPlan>;

    /// Fetch a plan, `None` when it does not exist.
    async fn get_workflow(&self, id: Uuid) -> AppResult<Option<WorkflowPlan>>;

    /// All plans, newest first.
    async fn list_workflows(&self) -> AppResult<Vec<WorkflowPlan>>;

    /// Create an execution of `workflow_id` in `Running` state.
    async fn create_execution(&self, workflow_id: Uuid) -> AppResult<Execution>;

    /// Create the row for step `index` of an execution in `Running` state.
    async fn create_execution_step(
        &self,
        execution_id: Uuid,
        index: i32,
        spec: &StepSpec,
    ) -> AppResult<ExecutionStep>;

    async fn update_execution_step(
        &self,
        id: Uuid,
        status: RunStatus,
        result: Option<&serde_json::Value>,
        error: Option<&str>,
    ) -> AppResult<()>;

    async fn update_execution(
        &self,
        id: Uuid,
        status: RunStatus,
        error: Option<&str>,
    ) -> AppResult<()>;

    /// Execution with its workflow name and steps ordered by index.
    async fn get_execution(&self, id: Uuid) -> AppResult<Option<ExecutionDetail>>;

    /// All executions with workflow names, newest first.
    async fn list_executions(&self) -> AppResult<Vec<ExecutionSummary>>;

    async fn analytics(&self) -> AppResult<Analytics>;

    /// Whether the backing store is reachable.
    async fn health(&self) -> bool;
}
