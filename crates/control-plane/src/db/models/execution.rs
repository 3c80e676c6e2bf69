//! Execution and execution step models.
//!
//! An execution is one run of a workflow plan. Its steps are created one by
//! one as the orchestrator reaches them, so a failed run only has rows for
//! the steps it actually attempted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::models::AgentType;
use crate::engine::RunStatus;
use crate::error::AppError;

/// One run of a workflow plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Persisted state of one plan step within one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStep {
    pub id: Uuid,
    pub execution_id: Uuid,
    pub step_index: i32,
    pub name: String,
    pub agent_type: AgentType,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Execution listing entry with the owning workflow's name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    #[serde(flatten)]
    pub execution: Execution,
    pub workflow_name: String,
}

/// Execution with its steps in index order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionDetail {
    #[serde(flatten)]
    pub execution: Execution,
    pub workflow_name: String,
    pub steps: Vec<ExecutionStep>,
}

/// Aggregate execution statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_workflows: i64,
    pub total_executions: i64,
    /// Completed executions as a rounded percentage of all executions.
    pub success_rate: i64,
    /// Execution count per status; every status is present.
    pub status_counts: BTreeMap<String, i64>,
}

impl Analytics {
    /// Build the aggregate from raw per-status counts.
    pub fn from_counts(total_workflows: i64, counts: &[(RunStatus, i64)]) -> Self {
        let mut status_counts: BTreeMap<String, i64> = RunStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        for (status, count) in counts {
            *status_counts.entry(status.as_str().to_string()).or_insert(0) += count;
        }

        let total_executions: i64 = status_counts.values().sum();
        let completed = status_counts
            .get(RunStatus::Completed.as_str())
            .copied()
            .unwrap_or(0);
        let success_rate = if total_executions == 0 {
            0
        } else {
            ((completed as f64 / total_executions as f64) * 100.0).round() as i64
        };

        Self {
            total_workflows,
            total_executions,
            success_rate,
            status_counts,
        }
    }
}

/// `executions` table row.
#[derive(Debug, Clone, FromRow)]
pub struct ExecutionRow {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl TryFrom<ExecutionRow> for Execution {
    type Error = AppError;

    fn try_from(row: ExecutionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            workflow_id: row.workflow_id,
            status: row.status.parse().map_err(AppError::Internal)?,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
        })
    }
}

/// `execution_steps` table row.
#[derive(Debug, Clone, FromRow)]
pub struct ExecutionStepRow {
    pub id: Uuid,
    pub execution_id: Uuid,
    pub step_index: i32,
    pub name: String,
    pub agent_type: String,
    pub status: String,
    pub result_payload: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ExecutionStepRow> for ExecutionStep {
    type Error = AppError;

    fn try_from(row: ExecutionStepRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            execution_id: row.execution_id,
            step_index: row.step_index,
            name: row.name,
            agent_type: row.agent_type.parse().map_err(AppError::Internal)?,
            status: row.status.parse().map_err(AppError::Internal)?,
            result_payload: row.result_payload,
            error_message: row.error_message,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analytics_success_rate_rounds() {
        let analytics = Analytics::from_counts(
            2,
            &[(RunStatus::Completed, 2), (RunStatus::Failed, 1)],
        );
        assert_eq!(analytics.total_executions, 3);
        assert_eq!(analytics.success_rate, 67);
        assert_eq!(analytics.status_counts["running"], 0);
        assert_eq!(analytics.status_counts["failed"], 1);
    }

    #[test]
    fn test_analytics_empty_has_zero_rate() {
        let analytics = Analytics::from_counts(0, &[]);
        assert_eq!(analytics.total_executions, 0);
        assert_eq!(analytics.success_rate, 0);
        assert_eq!(analytics.status_counts.len(), 4);
    }

    #[test]
    fn test_execution_row_with_unknown_status_is_rejected() {
        let row = ExecutionRow {
            id: Uuid::new_v4(),
            workflow_id: Uuid::new_v4(),
            status: "cancelled".to_string(),
            started_at: Utc::now(),
            completed_at: None,
            error_message: None,
        };
        assert!(Execution::try_from(row).is_err());
    }

    #[test]
    fn test_summary_flattens_execution() {
        let summary = ExecutionSummary {
            execution: Execution {
                id: Uuid::new_v4(),
                workflow_id: Uuid::new_v4(),
                status: RunStatus::Running,
                started_at: Utc::now(),
                completed_at: None,
                error_message: None,
            },
            workflow_name: "digest".to_string(),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["workflowName"], "digest");
        assert!(json.get("completedAt").is_none());
    }
}
