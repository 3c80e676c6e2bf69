//! Database module for the AgentFlow Control Plane server.
//!
//! PostgreSQL connectivity, schema bootstrap, models and queries using SQLx.

pub mod models;
pub mod pool;
pub mod queries;
pub mod schema;

pub use pool::{create_pool, DbPool};
