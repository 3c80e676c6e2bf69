//! Server-Sent Events stream of execution updates.

use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

use crate::notify::{BroadcastNotifier, ExecutionEvent};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    /// Only forward events for this execution.
    pub execution_id: Option<Uuid>,
}

/// Stream execution and step updates as they happen.
///
/// GET /api/events
pub async fn stream(
    State(events): State<BroadcastNotifier>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let filter = query.execution_id;
    let receiver = events.subscribe();
    tracing::debug!(
        execution_id = ?filter,
        subscribers = events.subscriber_count(),
        "Event stream subscribed"
    );

    let stream = BroadcastStream::new(receiver).filter_map(move |received| {
        match received {
            Ok(event) if filter.map_or(true, |id| event.execution_id() == id) => {
                to_sse(&event).map(Ok)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Event stream subscriber lagged");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_sse(event: &ExecutionEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(payload) => Some(Event::default().event(event.kind()).data(payload)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize execution event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RunStatus;

    #[test]
    fn test_query_accepts_camel_case() {
        let id = Uuid::new_v4();
        let query: EventsQuery =
            serde_json::from_value(serde_json::json!({ "executionId": id })).unwrap();
        assert_eq!(query.execution_id, Some(id));
    }

    #[test]
    fn test_to_sse_builds_event() {
        let event = ExecutionEvent::execution(Uuid::new_v4(), RunStatus::Completed, None);
        assert!(to_sse(&event).is_some());
    }
}
