//! Service layer for the AgentFlow Control Plane.
//!
//! Services hold the business rules between HTTP handlers and the
//! repository, planner and orchestrator.

pub mod execution;
pub mod workflow;

pub use execution::{ExecutionService, StartedExecution};
pub use workflow::{CreateWorkflowRequest, WorkflowService};
