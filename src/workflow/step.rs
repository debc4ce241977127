use async_trait::async_trait;
use serde_json::Value;

use crate::context::RunContext;
use crate::error::StepError;

use super::schema::Schema;

// A named unit of work. Input and output are validated against the declared
// schemas at the workflow boundary, not inside the step. Steps perform no
// retries; retry policy belongs to the collaborator a step wraps.
#[async_trait]
pub trait Step: Send + Sync {
    fn id(&self) -> &str;

    fn input_schema(&self) -> &Schema;

    fn output_schema(&self) -> &Schema;

    async fn execute(&self, input: Value, ctx: &RunContext) -> Result<Value, StepError>;
}
