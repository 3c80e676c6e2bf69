//! Plan extraction from model output.
//!
//! Models wrap JSON in prose or markdown fences more often than not, so the
//! parser scans the text for the first JSON value shaped like a plan, skipping
//! brackets that belong to the prose. Accepted shapes:
//!
//! ```text
//! [ {step}, {step}, ... ]
//! { "steps": [ {step}, ... ], ... }
//! ```

use serde_json::Value;

use crate::db::models::StepSpec;

use super::PlanningError;

/// Parse the steps out of a planner reply.
pub fn parse_plan(content: &str) -> Result<Vec<StepSpec>, PlanningError> {
    let body = strip_code_fence(content);
    let value = first_plan_value(body)?;

    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("steps") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(PlanningError::InvalidPlan(
                    "expected a \"steps\" array".to_string(),
                ))
            }
        },
        _ => {
            return Err(PlanningError::InvalidPlan(
                "expected a JSON array or object".to_string(),
            ))
        }
    };

    if entries.is_empty() {
        return Err(PlanningError::InvalidPlan("plan has no steps".to_string()));
    }

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            serde_json::from_value::<StepSpec>(entry)
                .map_err(|e| PlanningError::InvalidPlan(format!("step {}: {}", i, e)))
        })
        .collect()
}

/// Contents of the first fenced block, or the whole text when unfenced.
fn strip_code_fence(content: &str) -> &str {
    let Some(open) = content.find("```") else {
        return content;
    };
    let after_open = &content[open + 3..];
    // skip the info string, e.g. ```json
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(after_open.len());
    let body = &after_open[body_start..];
    match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    }
}

/// First value starting at a `[` or `{` that is an array or an object with
/// `steps`. Falls back to the first value that parses at all, so shape errors
/// still name the problem.
fn first_plan_value(text: &str) -> Result<Value, PlanningError> {
    let mut fallback = None;
    let mut first_error = None;
    // end of the last value that parsed; brackets inside it are not candidates
    let mut parsed_until = 0;

    for (start, _) in text.match_indices(['[', '{']) {
        if start < parsed_until {
            continue;
        }
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(value)) if looks_like_plan(&value) => return Ok(value),
            Some(Ok(value)) => {
                parsed_until = start + values.byte_offset();
                fallback.get_or_insert(value);
            }
            Some(Err(e)) => {
                first_error.get_or_insert(e);
            }
            None => {}
        }
    }

    if let Some(value) = fallback {
        return Ok(value);
    }
    Err(PlanningError::InvalidPlan(match first_error {
        Some(e) => e.to_string(),
        None => "no JSON found in planner output".to_string(),
    }))
}

fn looks_like_plan(value: &Value) -> bool {
    match value {
        Value::Array(_) => true,
        Value::Object(map) => map.contains_key("steps"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::AgentType;
    use serde_json::json;

    #[test]
    fn test_parse_bare_array() {
        let steps = parse_plan(
            r#"[
                {"name": "fetch", "agentType": "data", "action": "query", "params": {"table": "orders"}},
                {"name": "mail", "agentType": "communication", "action": "send_email"}
            ]"#,
        )
        .unwrap();

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].agent_type, AgentType::Data);
        assert_eq!(steps[0].params, json!({"table": "orders"}));
        assert_eq!(steps[1].params, json!({}));
    }

    #[test]
    fn test_parse_fenced_object_with_prose() {
        let content = "Here is your plan:\n```json\n{\"steps\": [{\"name\": \"check\", \"agentType\": \"validation\", \"action\": \"verify\"}]}\n```\nLet me know!";
        let steps = parse_plan(content).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].name, "check");
    }

    #[test]
    fn test_trailing_text_after_json_is_ignored() {
        let content = r#"[{"name": "a", "agentType": "analysis", "action": "x"}] hope that helps"#;
        assert_eq!(parse_plan(content).unwrap().len(), 1);
    }

    #[test]
    fn test_brackets_in_prose_are_skipped() {
        let content = "Plan [v2] below:\n[{\"name\":\"a\",\"agentType\":\"data\",\"action\":\"x\"}]";
        let steps = parse_plan(content).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].name, "a");

        let content = r#"Using {placeholders} here. {"steps": [{"name": "b", "agentType": "analysis", "action": "y"}]}"#;
        assert_eq!(parse_plan(content).unwrap()[0].name, "b");
    }

    #[test]
    fn test_rejects_prose_only() {
        let err = parse_plan("I cannot help with that.").unwrap_err();
        assert!(matches!(err, PlanningError::InvalidPlan(_)));
    }

    #[test]
    fn test_rejects_object_without_steps() {
        let err = parse_plan(r#"{"plan": []}"#).unwrap_err();
        assert_eq!(err.to_string(), "Invalid plan: expected a \"steps\" array");
    }

    #[test]
    fn test_rejects_empty_plan() {
        assert!(parse_plan("[]").is_err());
    }

    #[test]
    fn test_rejects_unknown_agent_type() {
        let err = parse_plan(r#"[{"name": "a", "agentType": "wizard", "action": "x"}]"#)
            .unwrap_err();
        assert!(err.to_string().starts_with("Invalid plan: step 0"));
    }
}
