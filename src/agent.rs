use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::error::AgentError;

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const STREAM_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, AgentError>> + Send>>;

// A streaming text-generation collaborator. Callers must fully drain the
// stream; the only contract across fragments is concatenation order.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    async fn stream(&self, messages: &[Message]) -> Result<TextStream, AgentError>;
}

pub async fn drain(mut stream: TextStream) -> Result<String, AgentError> {
    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        text.push_str(&fragment?);
    }
    Ok(text)
}

// Chat-completions agent speaking the server-sent-events stream format.
pub struct HttpAgent {
    name: String,
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    instructions: Option<String>,
}

impl HttpAgent {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            name: name.into(),
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            instructions: None,
        })
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, messages: &[Message]) -> Value {
        let mut all = Vec::with_capacity(messages.len() + 1);
        if let Some(ref instructions) = self.instructions {
            all.push(Message::system(instructions.clone()));
        }
        all.extend(messages.iter().cloned());
        json!({
            "model": self.model,
            "stream": true,
            "messages": all,
        })
    }
}

#[async_trait]
impl Agent for HttpAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(&self, messages: &[Message]) -> Result<TextStream, AgentError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!(agent = %self.name, model = %self.model, "Opening agent stream");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(messages))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentError::Api {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let agent_name = self.name.clone();

        tokio::spawn(async move {
            let mut bytes = Box::pin(resp.bytes_stream());
            let mut buf: Vec<u8> = Vec::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!(agent = %agent_name, error = %e, "Agent stream transport error");
                        let _ = tx.send(Err(AgentError::Transport(e))).await;
                        return;
                    }
                };
                buf.extend_from_slice(&chunk);

                // SSE events are newline-delimited; only complete lines are
                // decoded so multi-byte characters never split mid-fragment.
                while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line);
                    let line = line.trim();

                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();
                    if data == "[DONE]" {
                        return;
                    }

                    let parsed: Value = match serde_json::from_str(data) {
                        Ok(parsed) => parsed,
                        Err(e) => {
                            let _ = tx
                                .send(Err(AgentError::Malformed(format!(
                                    "undecodable event: {}",
                                    e
                                ))))
                                .await;
                            return;
                        }
                    };

                    let fragment = parsed["choices"][0]["delta"]["content"]
                        .as_str()
                        .unwrap_or_default();
                    if !fragment.is_empty() && tx.send(Ok(fragment.to_string())).await.is_err() {
                        return;
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}
