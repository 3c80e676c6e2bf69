//! Planner backed by an OpenAI-compatible chat completions API.

use std::time::Duration;

use async_trait::async_trait;
use minijinja::{context, Environment};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::db::models::{AgentType, StepSpec};

use super::{parse_plan, Planner, PlanningError};

const SYSTEM_PROMPT: &str = r#"You are a workflow planner. Break the user's goal into an ordered list of steps that can be run one after another.

Each step is handled by one category of agent:
{% for agent in agent_types %}- {{ agent }}
{% endfor %}
Reply with JSON only, no prose, in exactly this shape:
{"steps": [{"name": "<short unique name>", "description": "<what the step does>", "agentType": "<one of the categories above>", "action": "<verb_noun>", "params": {}}]}

Later steps can use the results of earlier steps by referring to them by name."#;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Calls `POST {base_url}/chat/completions` and parses the reply into steps.
pub struct HttpPlanner {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    env: Environment<'static>,
}

impl HttpPlanner {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PlanningError> {
        let client = Client::builder().timeout(timeout).build()?;

        let mut env = Environment::new();
        env.add_template("system", SYSTEM_PROMPT)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
            env,
        })
    }

    fn system_prompt(&self) -> Result<String, PlanningError> {
        let agent_types: Vec<&str> = AgentType::ALL.iter().map(|t| t.as_str()).collect();
        let rendered = self
            .env
            .get_template("system")?
            .render(context! { agent_types => agent_types })?;
        Ok(rendered)
    }
}

#[async_trait]
impl Planner for HttpPlanner {
    async fn plan(&self, prompt: &str) -> Result<Vec<StepSpec>, PlanningError> {
        let system = self.system_prompt()?;
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.2,
        };

        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(url = %url, model = %self.model, "Requesting plan");

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlanningError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response.json().await?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(PlanningError::EmptyResponse)?;

        let steps = parse_plan(&content)?;
        tracing::info!(steps = steps.len(), "Plan generated");
        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> HttpPlanner {
        HttpPlanner::new(
            "https://llm.example.com/v1/",
            "gpt-4o-mini",
            Some(String::new()),
            Duration::from_secs(30),
        )
        .unwrap()
    }

    #[test]
    fn test_system_prompt_lists_every_agent_type() {
        let prompt = planner().system_prompt().unwrap();
        for agent in AgentType::ALL {
            assert!(prompt.contains(&format!("- {}", agent)), "missing {}", agent);
        }
        assert!(prompt.contains("\"agentType\""));
    }

    #[test]
    fn test_empty_api_key_is_ignored() {
        let planner = planner();
        assert!(planner.api_key.is_none());
        assert_eq!(planner.base_url, "https://llm.example.com/v1");
    }

    #[test]
    fn test_chat_response_without_content() {
        let reply: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"role": "assistant"}}]}"#).unwrap();
        assert!(reply.choices[0].message.content.is_none());
    }
}
