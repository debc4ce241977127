use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("expected an object payload")]
    NotAnObject,

    #[error("missing field '{0}'")]
    MissingField(String),

    #[error("field '{field}' expects {expected} but got {found}")]
    KindMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("workflow '{0}' has no steps")]
    Empty(String),

    #[error("duplicate step id '{step}' in workflow '{workflow}'")]
    DuplicateStep { workflow: String, step: String },

    #[error("output of step '{producer}' does not satisfy input of step '{consumer}': {source}")]
    SchemaMismatch {
        producer: String,
        consumer: String,
        #[source]
        source: SchemaError,
    },
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("agent transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed stream payload: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum StepError {
    #[error("agent '{0}' is not registered")]
    AgentNotFound(String),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("location '{0}' not found")]
    LocationNotFound(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid step payload: {0}")]
    Payload(String),

    #[error("failed to encode step output: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("malformed dataset item input: {0}")]
    MalformedInput(String),

    #[error("failed to encode task output: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("evaluator '{name}' failed: {reason}")]
    Failed { name: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("run evaluator '{name}' failed")]
    RunEvaluator {
        name: String,
        #[source]
        source: EvaluatorError,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dataset '{0}' not found")]
    NotFound(String),

    #[error("dataset '{0}' already exists")]
    AlreadyExists(String),

    #[error("store transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store API error {status}: {body}")]
    Api { status: u16, body: String },
}
