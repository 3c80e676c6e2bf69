//! Database models for the AgentFlow Control Plane.
//!
//! Domain types returned by the repository, plus the `sqlx` row types
//! they are decoded from.

pub mod execution;
pub mod workflow;

pub use execution::*;
pub use workflow::*;
