pub mod pipeline;
pub mod run;
pub mod schema;
pub mod step;

pub use pipeline::{Workflow, WorkflowBuilder};
pub use run::{RunStatus, StepOutcome, WorkflowRun};
pub use schema::{Field, FieldKind, Schema};
pub use step::Step;
