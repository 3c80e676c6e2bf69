//! Workflow execution orchestrator.
//!
//! Drives one execution of a stored plan:
//! - creates the execution row and returns its id to the caller right away
//! - runs each step in plan order on a spawned task, one at a time
//! - persists every state change and then broadcasts it
//! - threads successful results forward through the [`ExecutionContext`]
//! - stops at the first failed step and marks the execution failed
//!
//! Nothing is retried or rolled back. A failed repository write abandons the
//! execution; the rows keep whatever state was last written.

use std::sync::Arc;

use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::db::models::{StepSpec, WorkflowPlan};
use crate::error::{AppError, AppResult};
use crate::notify::{ExecutionEvent, Notifier};
use crate::repository::Repository;
use crate::result_ext::ResultExt;

use super::context::ExecutionContext;
use super::runner::StepRunner;
use super::status::RunStatus;
use super::tasks::ExecutionTasks;

/// Starts executions and runs them to a terminal state.
#[derive(Clone)]
pub struct ExecutionOrchestrator {
    repository: Arc<dyn Repository>,
    notifier: Arc<dyn Notifier>,
    runner: StepRunner,
    tasks: ExecutionTasks,
}

impl ExecutionOrchestrator {
    pub fn new(
        repository: Arc<dyn Repository>,
        notifier: Arc<dyn Notifier>,
        runner: StepRunner,
    ) -> Self {
        Self {
            repository,
            notifier,
            runner,
            tasks: ExecutionTasks::new(),
        }
    }

    /// Registry of execution tasks started by this orchestrator.
    pub fn tasks(&self) -> &ExecutionTasks {
        &self.tasks
    }

    /// Start executing `workflow_id` and return the new execution's id.
    ///
    /// Fails with `NotFound` before anything is written when the workflow
    /// does not exist. Step processing continues in the background after
    /// this returns.
    pub async fn start_execution(&self, workflow_id: Uuid) -> AppResult<Uuid> {
        let plan = self
            .repository
            .get_workflow(workflow_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Workflow not found: {}", workflow_id)))?;

        let execution = self
            .repository
            .create_execution(plan.id)
            .await
            .log("creating execution")?;
        let execution_id = execution.id;

        info!(
            execution_id = %execution_id,
            workflow_id = %plan.id,
            steps = plan.steps.len(),
            "Execution started"
        );
        self.notifier
            .broadcast(ExecutionEvent::execution(execution_id, RunStatus::Running, None))
            .await;

        let this = self.clone();
        let span = tracing::info_span!("execution", execution_id = %execution_id);
        let handle = tokio::spawn(
            async move {
                if let Err(e) = this.run_steps(execution_id, &plan).await {
                    warn!(error = %e, "Execution abandoned");
                }
            }
            .instrument(span),
        );
        self.tasks.register(execution_id, handle);

        Ok(execution_id)
    }

    /// Run every step of `plan` in order and finalize the execution.
    async fn run_steps(&self, execution_id: Uuid, plan: &WorkflowPlan) -> AppResult<()> {
        let mut context = ExecutionContext::new();

        for (index, spec) in plan.steps.iter().enumerate() {
            let index = i32::try_from(index)
                .map_err(|_| AppError::Internal(format!("step index {} out of range", index)))?;

            if let Err(error) = self.run_step(execution_id, index, spec, &mut context).await? {
                self.repository
                    .update_execution(execution_id, RunStatus::Failed, Some(&error))
                    .await
                    .log("marking execution failed")?;
                self.notifier
                    .broadcast(ExecutionEvent::execution(
                        execution_id,
                        RunStatus::Failed,
                        Some(error.clone()),
                    ))
                    .await;

                info!(failed_step = index, error = %error, "Execution failed");
                return Ok(());
            }
        }

        self.repository
            .update_execution(execution_id, RunStatus::Completed, None)
            .await
            .log("marking execution completed")?;
        self.notifier
            .broadcast(ExecutionEvent::execution(execution_id, RunStatus::Completed, None))
            .await;

        info!(steps = plan.steps.len(), "Execution completed");
        Ok(())
    }

    /// Run one step. The inner `Err` carries the step's failure message.
    async fn run_step(
        &self,
        execution_id: Uuid,
        index: i32,
        spec: &StepSpec,
        context: &mut ExecutionContext,
    ) -> AppResult<Result<(), String>> {
        let step = self
            .repository
            .create_execution_step(execution_id, index, spec)
            .await
            .log("creating execution step")?;
        self.notifier
            .broadcast(ExecutionEvent::step(
                execution_id,
                step.id,
                index,
                RunStatus::Running,
                None,
                None,
            ))
            .await;

        debug!(
            step_index = index,
            step = %spec.name,
            agent_type = %spec.agent_type,
            action = %spec.action,
            "Running step"
        );
        let outcome = self.runner.run(spec, &context.snapshot()).await;

        if outcome.success {
            self.repository
                .update_execution_step(step.id, RunStatus::Completed, outcome.result.as_ref(), None)
                .await
                .log("marking step completed")?;
            self.notifier
                .broadcast(ExecutionEvent::step(
                    execution_id,
                    step.id,
                    index,
                    RunStatus::Completed,
                    outcome.result.clone(),
                    None,
                ))
                .await;

            context.merge(&spec.name, outcome.result);
            debug!(step_index = index, step = %spec.name, "Step completed");
            return Ok(Ok(()));
        }

        let error = outcome
            .error
            .unwrap_or_else(|| format!("step '{}' failed", spec.name));
        self.repository
            .update_execution_step(step.id, RunStatus::Failed, None, Some(&error))
            .await
            .log("marking step failed")?;
        self.notifier
            .broadcast(ExecutionEvent::step(
                execution_id,
                step.id,
                index,
                RunStatus::Failed,
                None,
                Some(error.clone()),
            ))
            .await;

        warn!(step_index = index, step = %spec.name, error = %error, "Step failed");
        Ok(Err(error))
    }
}
