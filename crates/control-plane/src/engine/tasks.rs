//! Registry of in-flight execution tasks.
//!
//! Used for the active-execution count and for draining on shutdown. It does
//! not cancel anything.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct ExecutionTasks {
    handles: Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>,
}

impl ExecutionTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track the task running `execution_id`.
    pub fn register(&self, execution_id: Uuid, handle: JoinHandle<()>) {
        let mut handles = self.lock();
        handles.retain(|_, h| !h.is_finished());
        handles.insert(execution_id, handle);
    }

    /// Number of executions whose task has not finished yet.
    pub fn active_count(&self) -> usize {
        let mut handles = self.lock();
        handles.retain(|_, h| !h.is_finished());
        handles.len()
    }

    /// Wait up to `grace` for every tracked execution to finish.
    ///
    /// Returns the number of executions still running when the grace period
    /// ran out.
    pub async fn wait_all(&self, grace: Duration) -> usize {
        let pending: Vec<(Uuid, JoinHandle<()>)> = self.lock().drain().collect();
        if pending.is_empty() {
            return 0;
        }

        tracing::info!(count = pending.len(), grace_secs = grace.as_secs(), "Waiting for in-flight executions");

        let deadline = tokio::time::Instant::now() + grace;
        let mut unfinished = 0;
        for (execution_id, handle) in pending {
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(execution_id = %execution_id, error = %e, "Execution task aborted");
                }
                Err(_) => {
                    tracing::warn!(execution_id = %execution_id, "Execution still running at shutdown");
                    unfinished += 1;
                }
            }
        }
        unfinished
    }

    // Poisoning is ignored, every operation leaves the map consistent.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, JoinHandle<()>>> {
        self.handles.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_active_count_prunes_finished_tasks() {
        let tasks = ExecutionTasks::new();
        let (tx, rx) = oneshot::channel::<()>();

        tasks.register(Uuid::new_v4(), tokio::spawn(async {}));
        tasks.register(
            Uuid::new_v4(),
            tokio::spawn(async move {
                let _ = rx.await;
            }),
        );

        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(tasks.active_count(), 1);

        tx.send(()).unwrap();
        assert_eq!(tasks.wait_all(Duration::from_secs(1)).await, 0);
        assert_eq!(tasks.active_count(), 0);
    }

    #[tokio::test]
    async fn test_wait_all_reports_stragglers() {
        let tasks = ExecutionTasks::new();
        tasks.register(
            Uuid::new_v4(),
            tokio::spawn(tokio::time::sleep(Duration::from_secs(3600))),
        );

        assert_eq!(tasks.wait_all(Duration::from_millis(20)).await, 1);
    }
}
