//! Per-execution result context.
//!
//! Maps step names to the result payload each completed step produced. Later
//! steps receive an immutable snapshot of everything merged so far.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

/// Accumulated step results for one execution.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    entries: Map<String, Value>,
}

/// Immutable view of an [`ExecutionContext`] handed to a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ContextSnapshot(Arc<Map<String, Value>>);

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `name`.
    ///
    /// A step that succeeded without a payload is recorded as `null` so the
    /// name is still visible to later steps.
    pub fn merge(&mut self, name: &str, result: Option<Value>) {
        let previous = self
            .entries
            .insert(name.to_string(), result.unwrap_or(Value::Null));
        if previous.is_some() {
            tracing::debug!(step = %name, "Context entry overwritten by later step");
        }
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot(Arc::new(self.entries.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ContextSnapshot {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object((*self.0).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_and_snapshot() {
        let mut ctx = ExecutionContext::new();
        assert!(ctx.snapshot().is_empty());

        ctx.merge("A", Some(json!({"rows": 3})));
        let snapshot = ctx.snapshot();
        assert_eq!(snapshot.get("A"), Some(&json!({"rows": 3})));
        assert_eq!(snapshot.to_value(), json!({"A": {"rows": 3}}));
    }

    #[test]
    fn test_later_name_wins() {
        let mut ctx = ExecutionContext::new();
        ctx.merge("fetch", Some(json!(1)));
        ctx.merge("fetch", Some(json!(2)));
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.snapshot().get("fetch"), Some(&json!(2)));
    }

    #[test]
    fn test_snapshot_is_not_affected_by_later_merges() {
        let mut ctx = ExecutionContext::new();
        ctx.merge("A", Some(json!("a")));
        let before = ctx.snapshot();
        ctx.merge("B", None);

        assert!(before.get("B").is_none());
        assert_eq!(ctx.snapshot().get("B"), Some(&Value::Null));
    }

    #[test]
    fn test_snapshot_serializes_as_object() {
        let mut ctx = ExecutionContext::new();
        ctx.merge("A", Some(json!([1, 2])));
        let json = serde_json::to_string(&ctx.snapshot()).unwrap();
        assert_eq!(json, r#"{"A":[1,2]}"#);
    }
}
