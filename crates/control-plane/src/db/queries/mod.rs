//! Database queries for the AgentFlow Control Plane.
//!
//! Plain functions over a `DbPool`, grouped by table. The Postgres
//! repository is a thin adapter over these.

pub mod analytics;
pub mod execution;
pub mod workflow;
