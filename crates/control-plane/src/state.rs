//! Application state for the AgentFlow Control Plane server.
//!
//! Shared by the health endpoints. Domain routes carry their own service as
//! state instead.

use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::engine::ExecutionTasks;
use crate::repository::Repository;

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn Repository>,

    pub config: Arc<AppConfig>,

    /// NATS client, when one is connected
    pub nats: Option<async_nats::Client>,

    /// In-flight execution tasks
    pub tasks: ExecutionTasks,

    /// Server start time for uptime calculation
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn Repository>,
        config: AppConfig,
        nats: Option<async_nats::Client>,
        tasks: ExecutionTasks,
    ) -> Self {
        Self {
            repository,
            config: Arc::new(config),
            nats,
            tasks,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn has_nats(&self) -> bool {
        self.nats.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;

    #[test]
    fn test_new_state() {
        let state = AppState::new(
            Arc::new(MemoryRepository::new()),
            AppConfig::default(),
            None,
            ExecutionTasks::new(),
        );
        assert!(!state.has_nats());
        assert_eq!(state.uptime_seconds(), 0);
        assert_eq!(state.tasks.active_count(), 0);
    }
}
