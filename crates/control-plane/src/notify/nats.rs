//! NATS JetStream notifier.
//!
//! Publishes every execution event as JSON to `{subject}.{executionId}`, so
//! consumers can follow one execution or all of them with `{subject}.>`.
//! Publishing is best-effort: failures are logged and dropped. `broadcast`
//! waits for the JetStream ack, so callers on the execution path put this
//! behind a [`super::QueuedNotifier`].

use async_nats::jetstream::{self, Context};
use async_trait::async_trait;

use super::{ExecutionEvent, Notifier, NotifyError};

/// Default subject prefix for execution events.
pub const DEFAULT_SUBJECT: &str = "agentflow.events";

/// Default JetStream stream name.
pub const DEFAULT_STREAM: &str = "agentflow_events";

#[derive(Clone)]
pub struct NatsNotifier {
    js: Context,
    subject: String,
}

impl NatsNotifier {
    /// Create a notifier on an existing client, creating the stream if needed.
    pub async fn new(
        client: async_nats::Client,
        subject: Option<&str>,
        stream_name: Option<&str>,
    ) -> Result<Self, NotifyError> {
        let subject = subject.unwrap_or(DEFAULT_SUBJECT).trim_end_matches('.').to_string();
        let stream = stream_name.unwrap_or(DEFAULT_STREAM);

        let js = jetstream::new(client);
        Self::ensure_stream(&js, stream, &subject).await?;

        Ok(Self { js, subject })
    }

    async fn ensure_stream(js: &Context, stream: &str, subject: &str) -> Result<(), NotifyError> {
        if js.get_stream(stream).await.is_ok() {
            tracing::debug!(stream = %stream, "Using existing NATS stream");
            return Ok(());
        }

        let config = jetstream::stream::Config {
            name: stream.to_string(),
            subjects: vec![format!("{}.>", subject)],
            max_age: std::time::Duration::from_secs(3600),
            storage: jetstream::stream::StorageType::File,
            ..Default::default()
        };

        js.create_stream(config)
            .await
            .map_err(|e| NotifyError::Publish(e.to_string()))?;

        tracing::info!(stream = %stream, subject = %subject, "Created NATS stream");
        Ok(())
    }

    fn subject_for(&self, event: &ExecutionEvent) -> String {
        format!("{}.{}", self.subject, event.execution_id())
    }

    /// Publish one event and wait for the JetStream ack.
    pub async fn publish(&self, event: &ExecutionEvent) -> Result<(), NotifyError> {
        let payload = serde_json::to_vec(event)?;

        self.js
            .publish(self.subject_for(event), payload.into())
            .await
            .map_err(|e| NotifyError::Publish(e.to_string()))?
            .await
            .map_err(|e| NotifyError::Publish(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl Notifier for NatsNotifier {
    async fn broadcast(&self, event: ExecutionEvent) {
        match self.publish(&event).await {
            Ok(()) => {
                tracing::debug!(
                    execution_id = %event.execution_id(),
                    kind = event.kind(),
                    status = %event.status(),
                    "Published execution event"
                );
            }
            Err(e) => {
                tracing::warn!(
                    execution_id = %event.execution_id(),
                    kind = event.kind(),
                    error = %e,
                    "Failed to publish execution event"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_error_converts_to_nats_error() {
        let err: crate::error::AppError = NotifyError::Publish("no responders".to_string()).into();
        assert!(matches!(err, crate::error::AppError::Nats(ref m) if m == "no responders"));
    }
}
