//! Decouples a slow notifier from the caller.
//!
//! [`QueuedNotifier`] hands events to a bounded channel drained by its own
//! task, so `broadcast` returns immediately whatever the inner notifier does.
//! Events keep their order. When the queue is full the newest event is
//! dropped and logged.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::{ExecutionEvent, Notifier};

/// Default number of events buffered ahead of the inner notifier.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct QueuedNotifier {
    tx: mpsc::Sender<ExecutionEvent>,
    name: &'static str,
}

impl QueuedNotifier {
    /// Spawn the forwarding task. Must be called inside a tokio runtime.
    pub fn spawn(name: &'static str, inner: Arc<dyn Notifier>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<ExecutionEvent>(capacity.max(1));

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                inner.broadcast(event).await;
            }
            tracing::debug!(notifier = name, "Notifier queue closed");
        });

        Self { tx, name }
    }
}

#[async_trait]
impl Notifier for QueuedNotifier {
    async fn broadcast(&self, event: ExecutionEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    notifier = self.name,
                    execution_id = %event.execution_id(),
                    kind = event.kind(),
                    "Notifier queue full, dropping event"
                );
            }
            Err(TrySendError::Closed(event)) => {
                tracing::warn!(
                    notifier = self.name,
                    execution_id = %event.execution_id(),
                    kind = event.kind(),
                    "Notifier queue closed, dropping event"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::sync::Mutex;
    use uuid::Uuid;

    use crate::engine::RunStatus;

    /// Never finishes a broadcast.
    struct Stalled;

    #[async_trait]
    impl Notifier for Stalled {
        async fn broadcast(&self, _event: ExecutionEvent) {
            std::future::pending::<()>().await;
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ExecutionEvent>>);

    #[async_trait]
    impl Notifier for Recorder {
        async fn broadcast(&self, event: ExecutionEvent) {
            self.0.lock().await.push(event);
        }
    }

    #[tokio::test]
    async fn test_stalled_inner_does_not_block_callers() {
        let queued = QueuedNotifier::spawn("stalled", Arc::new(Stalled), 2);
        let id = Uuid::new_v4();

        let sent = tokio::time::timeout(Duration::from_secs(1), async {
            for _ in 0..10 {
                queued
                    .broadcast(ExecutionEvent::execution(id, RunStatus::Running, None))
                    .await;
            }
        })
        .await;

        assert!(sent.is_ok());
    }

    #[tokio::test]
    async fn test_events_are_forwarded_in_order() {
        let recorder = Arc::new(Recorder::default());
        let queued = QueuedNotifier::spawn("recorder", recorder.clone(), 16);
        let id = Uuid::new_v4();

        for status in [RunStatus::Running, RunStatus::Completed] {
            queued.broadcast(ExecutionEvent::execution(id, status, None)).await;
        }

        for _ in 0..50 {
            if recorder.0.lock().await.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let statuses: Vec<RunStatus> = recorder.0.lock().await.iter().map(|e| e.status()).collect();
        assert_eq!(statuses, vec![RunStatus::Running, RunStatus::Completed]);
    }
}
