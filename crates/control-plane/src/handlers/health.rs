//! Health check endpoints for the AgentFlow Control Plane API.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Health status ("ok" or "unhealthy")
    pub status: String,
}

/// Detailed health check response for the API.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealthResponse {
    /// Overall health status
    pub status: String,

    /// Configured server name
    pub server: String,

    /// Repository reachability ("connected" or "disconnected")
    pub store: String,

    /// NATS status ("connected" or "not_configured")
    pub nats: String,

    /// Executions whose task is still running
    pub active_executions: usize,

    pub uptime_seconds: u64,

    pub version: String,
}

/// Liveness probe.
///
/// `GET /health`
pub async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "ok".to_string(),
    })
}

/// Detailed health check.
///
/// `GET /api/health`
///
/// - `200 OK` when the repository is reachable
/// - `503 Service Unavailable` otherwise
pub async fn api_health(State(state): State<AppState>) -> (StatusCode, Json<ApiHealthResponse>) {
    let store_healthy = state.repository.health().await;

    let (status, status_code) = if store_healthy {
        ("ok", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    let response = ApiHealthResponse {
        status: status.to_string(),
        server: state.config.server_name.clone(),
        store: if store_healthy { "connected" } else { "disconnected" }.to_string(),
        nats: if state.has_nats() { "connected" } else { "not_configured" }.to_string(),
        active_executions: state.tasks.active_count(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::AppConfig;
    use crate::engine::ExecutionTasks;
    use crate::repository::MemoryRepository;

    #[tokio::test]
    async fn test_health_check() {
        let response = health_check().await;
        assert_eq!(response.status, "ok");
    }

    #[tokio::test]
    async fn test_api_health_with_memory_store() {
        let state = AppState::new(
            Arc::new(MemoryRepository::new()),
            AppConfig::default(),
            None,
            ExecutionTasks::new(),
        );

        let (status, Json(body)) = api_health(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.server, "agentflow-control-plane");
        assert_eq!(body.store, "connected");
        assert_eq!(body.nats, "not_configured");
        assert_eq!(body.active_executions, 0);
    }
}
