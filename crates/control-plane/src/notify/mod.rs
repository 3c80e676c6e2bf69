//! Live execution notifications.
//!
//! The orchestrator emits an [`ExecutionEvent`] for every persisted state
//! change. Delivery is best-effort: a notifier never fails the execution, and
//! subscribers are expected to re-fetch execution detail when an event
//! arrives.

pub mod broadcast;
pub mod nats;
pub mod queued;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::engine::RunStatus;
use crate::error::AppError;

pub use self::broadcast::BroadcastNotifier;
pub use self::nats::NatsNotifier;
pub use self::queued::QueuedNotifier;

/// Event pushed to observers of an execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    #[serde(rename_all = "camelCase")]
    ExecutionUpdate {
        execution_id: Uuid,
        status: RunStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    StepUpdate {
        execution_id: Uuid,
        step_id: Uuid,
        step_index: i32,
        status: RunStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl ExecutionEvent {
    pub fn execution(execution_id: Uuid, status: RunStatus, error: Option<String>) -> Self {
        ExecutionEvent::ExecutionUpdate {
            execution_id,
            status,
            error,
        }
    }

    pub fn step(
        execution_id: Uuid,
        step_id: Uuid,
        step_index: i32,
        status: RunStatus,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) -> Self {
        ExecutionEvent::StepUpdate {
            execution_id,
            step_id,
            step_index,
            status,
            result,
            error,
        }
    }

    pub fn execution_id(&self) -> Uuid {
        match self {
            ExecutionEvent::ExecutionUpdate { execution_id, .. }
            | ExecutionEvent::StepUpdate { execution_id, .. } => *execution_id,
        }
    }

    pub fn status(&self) -> RunStatus {
        match self {
            ExecutionEvent::ExecutionUpdate { status, .. }
            | ExecutionEvent::StepUpdate { status, .. } => *status,
        }
    }

    /// Wire name of the event, the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionEvent::ExecutionUpdate { .. } => "execution_update",
            ExecutionEvent::StepUpdate { .. } => "step_update",
        }
    }
}

/// Errors from a notification backend. Logged, never propagated to the
/// execution.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Publish error: {0}")]
    Publish(String),
}

impl From<NotifyError> for AppError {
    fn from(e: NotifyError) -> Self {
        match e {
            NotifyError::Serialization(e) => AppError::Serialization(e),
            NotifyError::Publish(msg) => AppError::Nats(msg),
        }
    }
}

/// Fire-and-forget fan-out of execution events.
///
/// The orchestrator awaits `broadcast` between persisted writes, so
/// implementations must not wait on remote acknowledgements. Wrap those in a
/// [`QueuedNotifier`].
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn broadcast(&self, event: ExecutionEvent);
}

/// Forwards every event to each inner notifier, in order.
#[derive(Clone, Default)]
pub struct FanoutNotifier {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn broadcast(&self, event: ExecutionEvent) {
        for notifier in &self.notifiers {
            notifier.broadcast(event.clone()).await;
        }
    }
}
