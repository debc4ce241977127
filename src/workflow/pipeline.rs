use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::context::RunContext;
use crate::error::AssemblyError;

use super::run::{RunStatus, WorkflowRun};
use super::step::Step;

// An ordered chain of steps, committed once at assembly time. A committed
// workflow is a pure description: each `run` produces a fresh WorkflowRun and
// the workflow itself holds no mutable state.
pub struct Workflow {
    id: String,
    steps: Vec<Arc<dyn Step>>,
}

pub struct WorkflowBuilder {
    id: String,
    steps: Vec<Arc<dyn Step>>,
}

impl WorkflowBuilder {
    pub fn then(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn then_arc(mut self, step: Arc<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    // Verifies every adjacent output/input contract pair before the workflow
    // exists. No partial workflow escapes a failed commit.
    pub fn commit(self) -> Result<Workflow, AssemblyError> {
        if self.steps.is_empty() {
            return Err(AssemblyError::Empty(self.id));
        }

        for (i, step) in self.steps.iter().enumerate() {
            if self.steps[..i].iter().any(|s| s.id() == step.id()) {
                return Err(AssemblyError::DuplicateStep {
                    workflow: self.id,
                    step: step.id().to_string(),
                });
            }
        }

        for pair in self.steps.windows(2) {
            let producer = &pair[0];
            let consumer = &pair[1];
            consumer
                .input_schema()
                .accepts(producer.output_schema())
                .map_err(|source| AssemblyError::SchemaMismatch {
                    producer: producer.id().to_string(),
                    consumer: consumer.id().to_string(),
                    source,
                })?;
        }

        info!(
            workflow = %self.id,
            steps = %self.steps.len(),
            "Workflow committed"
        );

        Ok(Workflow {
            id: self.id,
            steps: self.steps,
        })
    }
}

impl Workflow {
    pub fn builder(id: impl Into<String>) -> WorkflowBuilder {
        WorkflowBuilder {
            id: id.into(),
            steps: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id()).collect()
    }

    // Executes steps strictly in order, each receiving the previous step's
    // output. Halts at the first failure; later steps get no outcome entry.
    pub async fn run(&self, initial_input: Value, ctx: &RunContext) -> WorkflowRun {
        let mut run = WorkflowRun::new(&self.id);
        let mut current = initial_input;

        ctx.trace().emit(
            "run_started",
            json!({ "workflow": self.id, "run_id": run.id() }),
        );

        for step in &self.steps {
            let step_id = step.id();

            if let Err(e) = step.input_schema().validate(&current) {
                warn!(workflow = %self.id, step = %step_id, error = %e, "Step input rejected");
                run.record_failure(step_id, format!("input validation failed: {}", e));
                break;
            }

            debug!(workflow = %self.id, step = %step_id, "Executing step");
            ctx.trace()
                .emit("step_started", json!({ "run_id": run.id(), "step": step_id }));

            let output = match step.execute(current.clone(), ctx).await {
                Ok(output) => output,
                Err(e) => {
                    warn!(workflow = %self.id, step = %step_id, error = %e, "Step failed");
                    ctx.trace().emit(
                        "step_failed",
                        json!({ "run_id": run.id(), "step": step_id, "error": e.to_string() }),
                    );
                    run.record_failure(step_id, e.to_string());
                    break;
                }
            };

            if let Err(e) = step.output_schema().validate(&output) {
                warn!(workflow = %self.id, step = %step_id, error = %e, "Step output rejected");
                run.record_failure(step_id, format!("output validation failed: {}", e));
                break;
            }

            ctx.trace()
                .emit("step_completed", json!({ "run_id": run.id(), "step": step_id }));
            run.record_success(step_id, output.clone());
            current = output;
        }

        if run.status() != RunStatus::Failed {
            run.finish(current);
        }

        ctx.trace().emit(
            "run_finished",
            json!({
                "run_id": run.id(),
                "status": run.status(),
                "completed_steps": run.completed_steps(),
            }),
        );

        info!(
            workflow = %self.id,
            run_id = %run.id(),
            status = ?run.status(),
            completed_steps = %run.completed_steps(),
            "Workflow run finished"
        );

        run
    }
}
