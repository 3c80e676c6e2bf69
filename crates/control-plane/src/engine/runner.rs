//! Single-step invocation.
//!
//! `StepRunner` is the only place that calls a [`StepExecutor`]. Whatever the
//! executor does (returns an error, hangs past the timeout, panics, reports a
//! failure without a message) comes back as a well-formed [`StepOutcome`].

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use crate::db::models::StepSpec;
use crate::executor::{StepExecutor, StepOutcome};

use super::context::ContextSnapshot;

/// Invokes the executor for one step and normalizes the outcome.
#[derive(Clone)]
pub struct StepRunner {
    executor: Arc<dyn StepExecutor>,
    timeout: Option<Duration>,
}

impl StepRunner {
    pub fn new(executor: Arc<dyn StepExecutor>) -> Self {
        Self {
            executor,
            timeout: None,
        }
    }

    /// Fail steps that run longer than `timeout`. `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `step` against `context`.
    ///
    /// A failed outcome always carries a non-empty error; a successful one
    /// never carries an error.
    pub async fn run(&self, step: &StepSpec, context: &ContextSnapshot) -> StepOutcome {
        let call = AssertUnwindSafe(self.executor.execute(step, context)).catch_unwind();

        let caught = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(caught) => caught,
                Err(_) => {
                    tracing::warn!(step = %step.name, timeout_secs = limit.as_secs(), "Step timed out");
                    return StepOutcome::failure(format!(
                        "step timed out after {}s",
                        limit.as_secs()
                    ));
                }
            },
            None => call.await,
        };

        match caught {
            Ok(Ok(outcome)) => normalize(step, outcome),
            Ok(Err(e)) => {
                tracing::warn!(step = %step.name, error = %e, "Executor error");
                StepOutcome::failure(e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(step = %step.name, panic = %message, "Executor panicked");
                StepOutcome::failure(format!("executor panicked: {}", message))
            }
        }
    }
}

fn normalize(step: &StepSpec, outcome: StepOutcome) -> StepOutcome {
    if outcome.success {
        return StepOutcome::success(outcome.result);
    }

    match outcome.error {
        Some(error) if !error.trim().is_empty() => StepOutcome::failure(error),
        _ => StepOutcome::failure(format!(
            "step '{}' failed without an error message",
            step.name
        )),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
