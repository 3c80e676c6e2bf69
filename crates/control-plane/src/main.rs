//! AgentFlow Control Plane Server
//!
//! Async Rust server that plans natural-language goals into step sequences
//! and executes them, persisting progress and streaming live status.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agentflow_control_plane::{
    config::{AppConfig, DatabaseConfig, StoreKind},
    db::{create_pool, schema::ensure_schema},
    engine::{ExecutionOrchestrator, StepRunner},
    executor::HttpStepExecutor,
    handlers,
    notify::{BroadcastNotifier, FanoutNotifier, NatsNotifier, Notifier, QueuedNotifier},
    planner::{HttpPlanner, Planner},
    repository::{MemoryRepository, PgRepository, Repository},
    services::{ExecutionService, WorkflowService},
    state::AppState,
};

/// Initialize tracing/logging.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,agentflow_control_plane=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the configured repository, creating the schema for PostgreSQL.
async fn build_repository(config: &AppConfig) -> anyhow::Result<Arc<dyn Repository>> {
    match config.store {
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store; state is lost on restart");
            Ok(Arc::new(MemoryRepository::new()))
        }
        StoreKind::Postgres => {
            let db_config = DatabaseConfig::from_env().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to load database config, using defaults");
                DatabaseConfig::default()
            });
            let pool = create_pool(&db_config).await?;
            ensure_schema(&pool).await?;
            Ok(Arc::new(PgRepository::new(pool)))
        }
    }
}

/// Connect to NATS if configured.
async fn connect_nats(config: &AppConfig) -> Option<async_nats::Client> {
    if let Some(ref nats_url) = config.nats_url {
        match async_nats::connect(nats_url).await {
            Ok(client) => {
                tracing::info!(url = %nats_url, "Connected to NATS");
                Some(client)
            }
            Err(e) => {
                tracing::warn!(error = %e, url = %nats_url, "Failed to connect to NATS, continuing without it");
                None
            }
        }
    } else {
        tracing::info!("NATS not configured, running without messaging");
        None
    }
}

/// Build the planner if a planner URL is configured.
fn build_planner(config: &AppConfig) -> anyhow::Result<Option<Arc<dyn Planner>>> {
    let Some(ref url) = config.planner_url else {
        tracing::info!("Planner not configured, workflows need explicit steps");
        return Ok(None);
    };

    let planner = HttpPlanner::new(
        url.clone(),
        config.planner_model.clone(),
        config.planner_api_key.clone(),
        config.planner_timeout(),
    )?;
    tracing::info!(
        url = %url,
        model = %config.planner_model,
        timeout = ?config.planner_timeout(),
        "Planner configured"
    );
    Ok(Some(Arc::new(planner)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting AgentFlow Control Plane"
    );

    let app_config = AppConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load app config, using defaults");
        AppConfig::default()
    });

    tracing::info!(
        host = %app_config.host,
        port = app_config.port,
        store = ?app_config.store,
        step_timeout = ?app_config.step_timeout(),
        executor_timeout = ?app_config.executor_timeout(),
        "Configuration loaded"
    );

    let repository = build_repository(&app_config).await?;

    // Notifiers: SSE channel always, NATS when available
    let events = BroadcastNotifier::new(app_config.event_buffer);
    let mut fanout = FanoutNotifier::new().with(Arc::new(events.clone()));
    let nats_client = connect_nats(&app_config).await;
    if let Some(ref client) = nats_client {
        match NatsNotifier::new(client.clone(), Some(&app_config.nats_subject), None).await {
            Ok(notifier) => {
                let queued =
                    QueuedNotifier::spawn("nats", Arc::new(notifier), app_config.event_buffer);
                fanout = fanout.with(Arc::new(queued));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to set up NATS event stream, continuing without it");
            }
        }
    }
    let notifier: Arc<dyn Notifier> = Arc::new(fanout);

    let executor = HttpStepExecutor::new(
        app_config.executor_url.clone(),
        app_config.executor_timeout(),
    )?;
    let runner = StepRunner::new(Arc::new(executor)).with_timeout(app_config.step_timeout());
    let orchestrator = ExecutionOrchestrator::new(repository.clone(), notifier, runner);
    let tasks = orchestrator.tasks().clone();

    let workflow_service = WorkflowService::new(repository.clone(), build_planner(&app_config)?);
    let execution_service = ExecutionService::new(repository.clone(), orchestrator);

    let state = AppState::new(repository, app_config.clone(), nats_client, tasks.clone());
    let app = handlers::build_router(state, workflow_service, execution_service, events);

    let addr: SocketAddr = app_config.bind_address().parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let unfinished = tasks.wait_all(app_config.shutdown_grace()).await;
    if unfinished > 0 {
        tracing::warn!(unfinished, "Shutting down with executions still running");
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
