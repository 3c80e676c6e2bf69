//! Workflow plan model.
//!
//! A plan is the immutable, ordered decomposition of a user goal into
//! typed steps. It is written once and only ever read afterwards.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Category of agent responsible for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Data,
    Communication,
    Integration,
    Analysis,
    Validation,
    Recovery,
    Orchestrator,
}

impl AgentType {
    pub const ALL: [AgentType; 7] = [
        AgentType::Data,
        AgentType::Communication,
        AgentType::Integration,
        AgentType::Analysis,
        AgentType::Validation,
        AgentType::Recovery,
        AgentType::Orchestrator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Data => "data",
            AgentType::Communication => "communication",
            AgentType::Integration => "integration",
            AgentType::Analysis => "analysis",
            AgentType::Validation => "validation",
            AgentType::Recovery => "recovery",
            AgentType::Orchestrator => "orchestrator",
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown agent type: {}", s))
    }
}

/// One step of a plan. Its position in `WorkflowPlan::steps` is its index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub agent_type: AgentType,
    pub action: String,
    /// Agent-specific parameters, opaque to the orchestrator.
    #[serde(default = "empty_params")]
    pub params: serde_json::Value,
}

fn empty_params() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl StepSpec {
    pub fn new(name: impl Into<String>, agent_type: AgentType, action: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            agent_type,
            action: action.into(),
            params: empty_params(),
        }
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }
}

/// A stored workflow plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowPlan {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub original_prompt: String,
    pub steps: Vec<StepSpec>,
    pub created_at: DateTime<Utc>,
}

/// Validated input for creating a plan.
#[derive(Debug, Clone)]
pub struct NewWorkflow {
    pub name: String,
    pub description: String,
    pub original_prompt: String,
    pub steps: Vec<StepSpec>,
}

impl NewWorkflow {
    /// Materialize the plan with a fresh id and creation time.
    pub fn into_plan(self) -> WorkflowPlan {
        WorkflowPlan {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            original_prompt: self.original_prompt,
            steps: self.steps,
            created_at: Utc::now(),
        }
    }
}

/// `workflows` table row.
#[derive(Debug, Clone, FromRow)]
pub struct WorkflowRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub original_prompt: String,
    pub steps: sqlx::types::Json<Vec<StepSpec>>,
    pub created_at: DateTime<Utc>,
}

impl From<WorkflowRow> for WorkflowPlan {
    fn from(row: WorkflowRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            original_prompt: row.original_prompt,
            steps: row.steps.0,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_type_parse() {
        assert_eq!("Data".parse::<AgentType>().unwrap(), AgentType::Data);
        assert_eq!(" recovery ".parse::<AgentType>().unwrap(), AgentType::Recovery);
        assert!("email".parse::<AgentType>().is_err());
    }

    #[test]
    fn test_step_spec_deserialization_defaults() {
        let step: StepSpec = serde_json::from_value(json!({
            "name": "fetch",
            "agentType": "data",
            "action": "query_rows"
        }))
        .unwrap();

        assert_eq!(step.agent_type, AgentType::Data);
        assert_eq!(step.description, "");
        assert_eq!(step.params, json!({}));
    }

    #[test]
    fn test_step_spec_rejects_unknown_agent_type() {
        let result: Result<StepSpec, _> = serde_json::from_value(json!({
            "name": "fetch",
            "agentType": "telepathy",
            "action": "guess"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_workflow_plan_serializes_camel_case() {
        let plan = NewWorkflow {
            name: "digest".to_string(),
            description: "daily digest".to_string(),
            original_prompt: "send me a digest".to_string(),
            steps: vec![StepSpec::new("A", AgentType::Data, "collect")],
        }
        .into_plan();

        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["originalPrompt"], "send me a digest");
        assert_eq!(json["steps"][0]["agentType"], "data");
        assert!(json.get("createdAt").is_some());
    }
}
