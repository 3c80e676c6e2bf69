//! Workflow execution engine.
//!
//! - **Orchestrator**: runs the steps of an execution in order
//! - **Runner**: invokes the executor for one step and normalizes the outcome
//! - **Context**: step results threaded forward to later steps
//! - **Status**: the run state machine shared by executions and steps
//! - **Tasks**: registry of in-flight execution tasks

pub mod context;
pub mod orchestrator;
pub mod runner;
pub mod status;
pub mod tasks;

pub use context::{ContextSnapshot, ExecutionContext};
pub use orchestrator::ExecutionOrchestrator;
pub use runner::StepRunner;
pub use status::RunStatus;
pub use tasks::ExecutionTasks;
