use std::collections::HashMap;
use std::sync::Arc;

use crate::agent::Agent;
use crate::trace::TraceBuffer;

// Explicit process-wide wiring: named agents plus the trace sink. Built once
// per process run and passed to workflows and the runner; steps look
// collaborators up here instead of through ambient globals.
pub struct RunContext {
    agents: HashMap<String, Arc<dyn Agent>>,
    trace: Arc<TraceBuffer>,
}

pub struct RunContextBuilder {
    agents: HashMap<String, Arc<dyn Agent>>,
    trace: Option<Arc<TraceBuffer>>,
}

impl RunContextBuilder {
    pub fn with_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.agents.insert(agent.name().to_string(), agent);
        self
    }

    pub fn with_trace(mut self, trace: Arc<TraceBuffer>) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn build(self) -> RunContext {
        RunContext {
            agents: self.agents,
            trace: self.trace.unwrap_or_default(),
        }
    }
}

impl RunContext {
    pub fn builder() -> RunContextBuilder {
        RunContextBuilder {
            agents: HashMap::new(),
            trace: None,
        }
    }

    pub fn agent(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(name).cloned()
    }

    pub fn agent_names(&self) -> Vec<&str> {
        self.agents.keys().map(String::as_str).collect()
    }

    pub fn trace(&self) -> &TraceBuffer {
        &self.trace
    }
}
