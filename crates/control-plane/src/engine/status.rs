//! Run status shared by executions and execution steps.
//!
//! ```text
//! Pending -> Running -> Completed   (terminal)
//!                    -> Failed      (terminal)
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of an execution or one of its steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Created but not started. Reserved for queued runs; the orchestrator
    /// creates rows directly in `Running`.
    Pending,
    /// Work is in flight.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

impl RunStatus {
    pub const ALL: [RunStatus; 4] = [
        RunStatus::Pending,
        RunStatus::Running,
        RunStatus::Completed,
        RunStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transition is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Re-asserting the current non-terminal status is allowed so that a
    /// row created as `Running` may be written as `Running` again.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Pending) => true,
            (Self::Pending, Self::Running) => true,
            (Self::Pending, Self::Failed) => true,
            (Self::Running, Self::Running) => true,
            (Self::Running, Self::Completed) => true,
            (Self::Running, Self::Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown run status: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(!RunStatus::Pending.is_terminal());
    }

    #[test]
    fn test_no_transition_leaves_terminal_state() {
        for from in [RunStatus::Completed, RunStatus::Failed] {
            for to in RunStatus::ALL {
                assert!(!from.can_transition_to(to), "{} -> {} allowed", from, to);
            }
        }
    }

    #[test]
    fn test_forward_transitions() {
        assert!(RunStatus::Pending.can_transition_to(RunStatus::Running));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Completed));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Failed));
        assert!(!RunStatus::Running.can_transition_to(RunStatus::Pending));
        assert!(!RunStatus::Pending.can_transition_to(RunStatus::Completed));
    }

    #[test]
    fn test_parse_and_serialize() {
        assert_eq!("Completed".parse::<RunStatus>().unwrap(), RunStatus::Completed);
        assert!("cancelled".parse::<RunStatus>().is_err());
        assert_eq!(serde_json::to_string(&RunStatus::Running).unwrap(), "\"running\"");
    }
}
