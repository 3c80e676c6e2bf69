//! Configuration module for the AgentFlow Control Plane server.
//!
//! Configuration is loaded from environment variables using the `envy`
//! crate; `main` also honours a `.env` file through `dotenvy`.

mod app;
mod database;

pub use app::{AppConfig, StoreKind};
pub use database::DatabaseConfig;
