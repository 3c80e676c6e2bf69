//! HTTP handlers for the AgentFlow Control Plane API.
//!
//! Route handlers are grouped by domain; [`build_router`] wires them together.

pub mod events;
pub mod executions;
pub mod health;
pub mod workflows;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::notify::BroadcastNotifier;
use crate::services::{ExecutionService, WorkflowService};
use crate::state::AppState;

pub use health::{api_health, health_check};

/// Build the application router with all routes.
pub fn build_router(
    state: AppState,
    workflow_service: WorkflowService,
    execution_service: ExecutionService,
    events: BroadcastNotifier,
) -> Router {
    // CORS configuration - allow all origins for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let health_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/health", get(api_health))
        .with_state(state);

    let workflow_routes = Router::new()
        .route(
            "/api/workflows",
            post(workflows::create).get(workflows::list),
        )
        .route("/api/workflows/{id}", get(workflows::get))
        .with_state(workflow_service);

    let execution_routes = Router::new()
        .route("/api/workflows/{id}/execute", post(workflows::execute))
        .route("/api/executions", get(executions::list))
        .route("/api/executions/{id}", get(executions::get))
        .route("/api/analytics", get(executions::analytics))
        .with_state(execution_service);

    let event_routes = Router::new()
        .route("/api/events", get(events::stream))
        .with_state(events);

    Router::new()
        .merge(health_routes)
        .merge(workflow_routes)
        .merge(execution_routes)
        .merge(event_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
