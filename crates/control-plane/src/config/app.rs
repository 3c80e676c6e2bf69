//! Application configuration for the AgentFlow Control Plane server.

use std::time::Duration;

use serde::Deserialize;

/// Persistence backend selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// PostgreSQL via the `POSTGRES_*` settings.
    #[default]
    Postgres,
    /// Process-local store, lost on restart.
    Memory,
}

/// Application configuration loaded from environment variables.
///
/// Environment variables are prefixed with `AGENTFLOW_`:
/// - `AGENTFLOW_HOST` / `AGENTFLOW_PORT`: bind address (default `0.0.0.0:8080`)
/// - `AGENTFLOW_STORE`: `postgres` or `memory`
/// - `AGENTFLOW_NATS_URL`: optional NATS server for event fan-out
/// - `AGENTFLOW_PLANNER_URL`: optional OpenAI-compatible endpoint
/// - `AGENTFLOW_EXECUTOR_URL`: step executor backend
/// - `AGENTFLOW_STEP_TIMEOUT_SECS`: optional per-step timeout (unset = none)
/// - `AGENTFLOW_EXECUTOR_TIMEOUT_SECS`: optional HTTP timeout for executor calls (unset = none)
/// - `AGENTFLOW_PLANNER_TIMEOUT_SECS`: HTTP timeout for planner calls (default 60)
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Server name reported by `/api/health`
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// Persistence backend
    #[serde(default)]
    pub store: StoreKind,

    /// NATS URL (optional)
    #[serde(default)]
    pub nats_url: Option<String>,

    /// Subject prefix for published execution events
    #[serde(default = "default_nats_subject")]
    pub nats_subject: String,

    /// Capacity of the in-process event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Planner base URL (optional; without it workflows need explicit steps)
    #[serde(default)]
    pub planner_url: Option<String>,

    /// Model name sent to the planner
    #[serde(default = "default_planner_model")]
    pub planner_model: String,

    /// Bearer token for the planner
    #[serde(default)]
    pub planner_api_key: Option<String>,

    /// Step executor backend base URL
    #[serde(default = "default_executor_url")]
    pub executor_url: String,

    /// Timeout for planner HTTP calls, in seconds
    #[serde(default = "default_planner_timeout")]
    pub planner_timeout_secs: u64,

    /// HTTP client timeout for executor calls, in seconds. Unset means the
    /// client waits as long as the agent takes.
    #[serde(default)]
    pub executor_timeout_secs: Option<u64>,

    /// Per-step timeout enforced by the runner, in seconds
    #[serde(default)]
    pub step_timeout_secs: Option<u64>,

    /// How long shutdown waits for in-flight executions, in seconds
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_server_name() -> String {
    "agentflow-control-plane".to_string()
}

fn default_nats_subject() -> String {
    "agentflow.events".to_string()
}

fn default_event_buffer() -> usize {
    1024
}

fn default_planner_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_executor_url() -> String {
    "http://localhost:8090".to_string()
}

fn default_planner_timeout() -> u64 {
    60
}

fn default_shutdown_grace() -> u64 {
    10
}

impl AppConfig {
    /// Load configuration from environment variables prefixed with `AGENTFLOW_`.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("AGENTFLOW_").from_env::<AppConfig>()
    }

    /// Get the server bind address as a string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn executor_timeout(&self) -> Option<Duration> {
        self.executor_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn planner_timeout(&self) -> Duration {
        Duration::from_secs(self.planner_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            server_name: default_server_name(),
            store: StoreKind::default(),
            nats_url: None,
            nats_subject: default_nats_subject(),
            event_buffer: default_event_buffer(),
            planner_url: None,
            planner_model: default_planner_model(),
            planner_api_key: None,
            executor_url: default_executor_url(),
            planner_timeout_secs: default_planner_timeout(),
            executor_timeout_secs: None,
            step_timeout_secs: None,
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.store, StoreKind::Postgres);
        assert!(config.step_timeout().is_none());
        assert!(config.executor_timeout().is_none());
        assert_eq!(config.planner_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_bind_address() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_zero_step_timeout_means_none() {
        let config = AppConfig {
            step_timeout_secs: Some(0),
            ..AppConfig::default()
        };
        assert!(config.step_timeout().is_none());

        let config = AppConfig {
            step_timeout_secs: Some(45),
            ..AppConfig::default()
        };
        assert_eq!(config.step_timeout(), Some(Duration::from_secs(45)));
    }

    #[test]
    fn test_from_iter_parses_store_and_timeout() {
        let vars = vec![
            ("STORE".to_string(), "memory".to_string()),
            ("STEP_TIMEOUT_SECS".to_string(), "30".to_string()),
            ("PORT".to_string(), "9000".to_string()),
            ("EXECUTOR_TIMEOUT_SECS".to_string(), "120".to_string()),
        ];
        let config: AppConfig = envy::from_iter(vars).unwrap();
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.step_timeout_secs, Some(30));
        assert_eq!(config.port, 9000);
        assert_eq!(config.executor_url, "http://localhost:8090");
        assert_eq!(config.executor_timeout(), Some(Duration::from_secs(120)));
    }
}
