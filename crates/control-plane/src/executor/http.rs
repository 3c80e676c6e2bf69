//! HTTP executor backend.
//!
//! Posts `{step, context}` to `{base_url}/agents/{agentType}` and reads a
//! [`StepOutcome`] back.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::db::models::StepSpec;
use crate::engine::ContextSnapshot;

use super::{ExecutorError, StepExecutor, StepOutcome};

#[derive(Serialize)]
struct AgentRequest<'a> {
    step: &'a StepSpec,
    context: &'a ContextSnapshot,
}

/// Executor that dispatches steps to an agent service over HTTP.
#[derive(Clone)]
pub struct HttpStepExecutor {
    client: Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl HttpStepExecutor {
    /// Without `timeout` a request waits as long as the agent takes; bounding
    /// a step is the runner's job.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ExecutorError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn endpoint(&self, step: &StepSpec) -> String {
        format!("{}/agents/{}", self.base_url, step.agent_type)
    }
}

#[async_trait]
impl StepExecutor for HttpStepExecutor {
    async fn execute(
        &self,
        step: &StepSpec,
        context: &ContextSnapshot,
    ) -> Result<StepOutcome, ExecutorError> {
        let url = self.endpoint(step);
        tracing::debug!(url = %url, step = %step.name, action = %step.action, "Dispatching step");

        let response = self
            .client
            .post(&url)
            .json(&AgentRequest { step, context })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExecutorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let outcome: StepOutcome = response.json().await?;
        Ok(outcome)
    }
}
