use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Success { output: Value },
    Failed { error: String },
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success { .. })
    }

    pub fn output(&self) -> Option<&Value> {
        match self {
            StepOutcome::Success { output } => Some(output),
            StepOutcome::Failed { .. } => None,
        }
    }
}

// One record per workflow invocation. Mutated only by the workflow's own
// execution loop; read-only once a terminal status is reached.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRun {
    id: Uuid,
    workflow_id: String,
    status: RunStatus,
    outcomes: HashMap<String, StepOutcome>,
    final_output: Option<Value>,
    started_at: DateTime<Utc>,
}

impl WorkflowRun {
    pub(crate) fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id: workflow_id.into(),
            status: RunStatus::Pending,
            outcomes: HashMap::new(),
            final_output: None,
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn final_output(&self) -> Option<&Value> {
        self.final_output.as_ref()
    }

    pub fn step_outcome(&self, step_id: &str) -> Option<&StepOutcome> {
        self.outcomes.get(step_id)
    }

    pub fn step_output(&self, step_id: &str) -> Option<&Value> {
        self.step_outcome(step_id).and_then(StepOutcome::output)
    }

    pub fn step_succeeded(&self, step_id: &str) -> bool {
        self.step_outcome(step_id)
            .map(StepOutcome::is_success)
            .unwrap_or(false)
    }

    pub fn completed_steps(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_success()).count()
    }

    pub(crate) fn record_success(&mut self, step_id: &str, output: Value) {
        self.outcomes
            .insert(step_id.to_string(), StepOutcome::Success { output });
    }

    pub(crate) fn record_failure(&mut self, step_id: &str, error: String) {
        self.outcomes
            .insert(step_id.to_string(), StepOutcome::Failed { error });
        self.status = RunStatus::Failed;
    }

    pub(crate) fn finish(&mut self, final_output: Value) {
        self.final_output = Some(final_output);
        self.status = RunStatus::Success;
    }
}
