//! AgentFlow Control Plane Library
//!
//! This crate turns natural-language goals into ordered, typed step plans
//! and runs them:
//!
//! - **Planning**: decompose a prompt into steps via an LLM planner
//! - **Orchestration**: run steps one at a time, threading results forward
//! - **Persistence**: workflows, executions and step rows in PostgreSQL or memory
//! - **Notification**: live execution events over SSE and NATS JetStream
//!
//! ## Architecture
//!
//! Each execution runs on its own tokio task. Every state change is written
//! to the [`repository::Repository`] first and then broadcast through the
//! [`notify::Notifier`]; observers re-fetch the execution on receipt.
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from environment variables
//! - [`db`]: PostgreSQL connectivity, schema and queries
//! - [`engine`]: Orchestrator, step runner, context and run status
//! - [`executor`]: Step executor backends
//! - [`handlers`]: HTTP route handlers
//! - [`notify`]: Execution event fan-out
//! - [`planner`]: Prompt-to-plan decomposition
//! - [`repository`]: Persistence contract and backends
//! - [`services`]: Workflow and execution use cases behind the handlers
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use agentflow_control_plane::{
//!     engine::{ExecutionOrchestrator, StepRunner},
//!     executor::HttpStepExecutor,
//!     notify::BroadcastNotifier,
//!     repository::MemoryRepository,
//! };
//!
//! let executor = HttpStepExecutor::new("http://localhost:8090", None)?;
//! let orchestrator = ExecutionOrchestrator::new(
//!     Arc::new(MemoryRepository::new()),
//!     Arc::new(BroadcastNotifier::default()),
//!     StepRunner::new(Arc::new(executor)),
//! );
//! let execution_id = orchestrator.start_execution(workflow_id).await?;
//! ```

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod notify;
pub mod planner;
pub mod repository;
pub mod result_ext;
pub mod services;
pub mod state;

pub use error::{AppError, AppResult};
pub use result_ext::ResultExt;
