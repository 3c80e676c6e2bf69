//! Workflow creation and lookup.
//!
//! A workflow is created either from an explicit step list or by asking the
//! configured planner to decompose the prompt. Both paths go through the same
//! validation before anything is stored.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::db::models::{NewWorkflow, StepSpec, WorkflowPlan};
use crate::error::{AppError, AppResult};
use crate::planner::Planner;
use crate::repository::Repository;

/// Maximum length of a name derived from the prompt, in characters.
const DERIVED_NAME_LEN: usize = 60;

/// Request body for creating a workflow.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkflowRequest {
    pub prompt: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Explicit steps; the planner is skipped when present.
    #[serde(default)]
    pub steps: Option<Vec<StepSpec>>,
}

/// Workflow management service.
#[derive(Clone)]
pub struct WorkflowService {
    repository: Arc<dyn Repository>,
    planner: Option<Arc<dyn Planner>>,
}

impl WorkflowService {
    pub fn new(repository: Arc<dyn Repository>, planner: Option<Arc<dyn Planner>>) -> Self {
        Self {
            repository,
            planner,
        }
    }

    /// Whether prompts can be planned without an explicit step list.
    pub fn has_planner(&self) -> bool {
        self.planner.is_some()
    }

    /// Validate, plan if needed, and store a new workflow.
    pub async fn create(&self, request: CreateWorkflowRequest) -> AppResult<WorkflowPlan> {
        let prompt = request.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(AppError::Validation("prompt must not be empty".to_string()));
        }

        let steps = match request.steps {
            Some(steps) => steps,
            None => {
                let planner = self.planner.as_ref().ok_or_else(|| {
                    AppError::Validation(
                        "no planner is configured; provide steps explicitly".to_string(),
                    )
                })?;
                planner.plan(&prompt).await?
            }
        };
        let steps = validate_steps(steps)?;

        let name = request
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| derive_name(&prompt));
        let description = request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| prompt.clone());

        let plan = self
            .repository
            .create_workflow(NewWorkflow {
                name,
                description,
                original_prompt: prompt,
                steps,
            })
            .await?;

        tracing::info!(workflow_id = %plan.id, name = %plan.name, steps = plan.steps.len(), "Workflow created");
        Ok(plan)
    }

    /// All workflows, newest first.
    pub async fn list(&self) -> AppResult<Vec<WorkflowPlan>> {
        self.repository.list_workflows().await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<WorkflowPlan> {
        self.repository
            .get_workflow(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Workflow not found: {}", id)))
    }
}

/// Check a step list and normalize null params to `{}`.
///
/// Duplicate step names are allowed; later results shadow earlier ones in the
/// execution context, so they are only logged.
pub fn validate_steps(steps: Vec<StepSpec>) -> AppResult<Vec<StepSpec>> {
    if steps.is_empty() {
        return Err(AppError::Validation(
            "workflow must have at least one step".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    steps
        .into_iter()
        .enumerate()
        .map(|(index, mut step)| {
            step.name = step.name.trim().to_string();
            step.action = step.action.trim().to_string();

            if step.name.is_empty() {
                return Err(AppError::Validation(format!("step {} has no name", index)));
            }
            if step.action.is_empty() {
                return Err(AppError::Validation(format!(
                    "step {} ('{}') has no action",
                    index, step.name
                )));
            }
            match step.params {
                serde_json::Value::Object(_) => {}
                serde_json::Value::Null => step.params = serde_json::json!({}),
                _ => {
                    return Err(AppError::Validation(format!(
                        "step {} ('{}') params must be an object",
                        index, step.name
                    )))
                }
            }
            if !seen.insert(step.name.clone()) {
                tracing::warn!(step = %step.name, index, "Duplicate step name; later result will shadow earlier one");
            }
            Ok(step)
        })
        .collect()
}

fn derive_name(prompt: &str) -> String {
    prompt.chars().take(DERIVED_NAME_LEN).collect::<String>().trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::AgentType;
    use crate::planner::PlanningError;
    use crate::repository::MemoryRepository;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakePlanner {
        reply: Result<Vec<StepSpec>, String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Planner for FakePlanner {
        async fn plan(&self, _prompt: &str) -> Result<Vec<StepSpec>, PlanningError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .clone()
                .map_err(PlanningError::InvalidPlan)
        }
    }

    fn service(reply: Option<Result<Vec<StepSpec>, String>>) -> (WorkflowService, Option<Arc<FakePlanner>>) {
        let planner = reply.map(|reply| {
            Arc::new(FakePlanner {
                reply,
                calls: AtomicUsize::new(0),
            })
        });
        let service = WorkflowService::new(
            Arc::new(MemoryRepository::new()),
            planner.clone().map(|p| p as Arc<dyn Planner>),
        );
        (service, planner)
    }

    fn request(prompt: &str) -> CreateWorkflowRequest {
        CreateWorkflowRequest {
            prompt: prompt.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_from_planner() {
        let (service, planner) = service(Some(Ok(vec![
            StepSpec::new("fetch", AgentType::Data, "query"),
            StepSpec::new("mail", AgentType::Communication, "send_email"),
        ])));

        let plan = service
            .create(request("Email me yesterday's order count"))
            .await
            .unwrap();

        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.name, "Email me yesterday's order count");
        assert_eq!(plan.description, "Email me yesterday's order count");
        assert_eq!(plan.original_prompt, "Email me yesterday's order count");
        assert_eq!(planner.unwrap().calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.get(plan.id).await.unwrap().id, plan.id);
    }

    #[tokio::test]
    async fn test_explicit_steps_skip_planner() {
        let (service, planner) = service(Some(Err("should not be called".to_string())));

        let plan = service
            .create(CreateWorkflowRequest {
                prompt: "check inventory".to_string(),
                name: Some("Inventory".to_string()),
                description: None,
                steps: Some(vec![StepSpec::new("check", AgentType::Validation, "verify")]),
            })
            .await
            .unwrap();

        assert_eq!(plan.name, "Inventory");
        assert_eq!(planner.unwrap().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_planner_failure_is_planning_error() {
        let (service, _) = service(Some(Err("model returned prose".to_string())));

        let err = service.create(request("do it")).await.unwrap_err();
        assert!(matches!(err, AppError::Planning(_)));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_planner_and_no_steps() {
        let (service, _) = service(None);
        assert!(!service.has_planner());

        let err = service.create(request("do it")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let (service, _) = service(None);
        let err = service.create(request("   ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_get_unknown_workflow() {
        let (service, _) = service(None);
        let err = service.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_validate_steps_rules() {
        assert!(validate_steps(vec![]).is_err());
        assert!(validate_steps(vec![StepSpec::new(" ", AgentType::Data, "q")]).is_err());
        assert!(validate_steps(vec![StepSpec::new("a", AgentType::Data, "")]).is_err());
        assert!(validate_steps(vec![
            StepSpec::new("a", AgentType::Data, "q").with_params(json!([1, 2]))
        ])
        .is_err());

        let steps = validate_steps(vec![
            StepSpec::new("a", AgentType::Data, "q").with_params(serde_json::Value::Null),
            StepSpec::new("a", AgentType::Analysis, "r"),
        ])
        .unwrap();
        assert_eq!(steps[0].params, json!({}));
        assert_eq!(steps.len(), 2);
    }

    #[test]
    fn test_derive_name_truncates_by_chars() {
        let prompt = "é".repeat(80);
        assert_eq!(derive_name(&prompt).chars().count(), 60);
        assert_eq!(derive_name("short goal"), "short goal");
    }
}
