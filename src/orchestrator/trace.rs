//! Per-execution step log.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One recorded workflow step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub step: String,
    pub tool: String,
    pub input: Value,
    pub output: Value,
    /// Milliseconds spent in the step.
    pub duration: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Steps of a single workflow execution, in the order they finished.
#[derive(Debug)]
pub struct ExecutionTrace {
    started: Instant,
    steps: Vec<ExecutionStep>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            steps: Vec::new(),
        }
    }

    pub fn record_success(
        &mut self,
        step: &str,
        tool: &str,
        input: Value,
        output: Value,
        since: Instant,
    ) {
        self.push(step, tool, input, output, since, None);
    }

    pub fn record_failure(
        &mut self,
        step: &str,
        tool: &str,
        input: Value,
        error: impl std::fmt::Display,
        since: Instant,
    ) {
        self.push(step, tool, input, Value::Null, since, Some(error.to_string()));
    }

    fn push(
        &mut self,
        step: &str,
        tool: &str,
        input: Value,
        output: Value,
        since: Instant,
        error: Option<String>,
    ) {
        self.steps.push(ExecutionStep {
            step: step.to_string(),
            tool: tool.to_string(),
            input,
            output,
            duration: since.elapsed().as_millis() as u64,
            success: error.is_none(),
            error,
            timestamp: Utc::now(),
        });
    }

    pub fn steps(&self) -> &[ExecutionStep] {
        &self.steps
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn into_steps(self) -> Vec<ExecutionStep> {
        self.steps
    }
}

impl Default for ExecutionTrace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn records_in_order_with_status() {
        let mut trace = ExecutionTrace::new();
        let t = Instant::now();
        trace.record_success("analyze_intent", "intent_analyzer", json!({"query": "x"}), json!({}), t);
        trace.record_failure("search_movies", "movie_search_workflow", json!({}), "boom", t);

        let steps = trace.steps();
        assert_eq!(steps.len(), 2);
        assert!(steps[0].success);
        assert_eq!(steps[0].error, None);
        assert!(!steps[1].success);
        assert_eq!(steps[1].error.as_deref(), Some("boom"));
        assert_eq!(steps[1].output, Value::Null);
    }
}
