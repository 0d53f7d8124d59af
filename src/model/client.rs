//! Ollama chat client
//!
//! `POST /api/chat`, either as one complete reply or streamed as
//! newline-delimited JSON.

use crate::errors::{AgentError, Result};
use crate::model::messages::Message;
use crate::model::stream::ChatStreamDecoder;
use crate::model::{ModelClient, ReplyStream};
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default model
pub const DEFAULT_MODEL: &str = "qwen2.5:7b-instruct";

/// Request timeout (120 seconds); full replies take longer than first tokens
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Ollama chat client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    /// Create new Ollama client with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_OLLAMA_URL, DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create Ollama client with custom configuration
    pub fn with_config(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AgentError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Send a chat request, mapping every failure to a transport error
    async fn send_chat(&self, messages: &[Message], stream: bool) -> Result<Response> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest::new(&self.model, messages, stream);

        debug!(model = %self.model, messages = messages.len(), stream, "sending chat request");
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::Transport(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AgentError::Transport(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn generate(&self, messages: &[Message]) -> Result<String> {
        let body: ChatResponse = self
            .send_chat(messages, false)
            .await?
            .json()
            .await
            .map_err(|e| AgentError::Transport(format!("Failed to parse response: {}", e)))?;

        Ok(body.message.content)
    }

    async fn generate_stream(&self, messages: &[Message]) -> Result<ReplyStream> {
        let response = self.send_chat(messages, true).await?;

        // `None` marks the end of the byte stream so the decoder can flush
        let chunks = response
            .bytes_stream()
            .map(Some)
            .chain(stream::once(async { None }));

        let pieces = chunks
            .scan(ChatStreamDecoder::new(), |decoder, chunk| {
                let decoded = match chunk {
                    Some(Ok(bytes)) => decoder.push(&bytes),
                    Some(Err(e)) => Err(AgentError::Transport(format!("Stream interrupted: {}", e))),
                    None => decoder.finish().map(|rest| rest.into_iter().collect()),
                };
                futures_util::future::ready(Some(decoded))
            })
            .flat_map(|decoded| {
                let items: Vec<Result<String>> = match decoded {
                    Ok(pieces) => pieces.into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(e)],
                };
                stream::iter(items)
            });

        Ok(pieces.boxed())
    }
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ChatRequest<'a> {
    fn new(model: &'a str, messages: &'a [Message], stream: bool) -> Self {
        Self {
            model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.wire_name(),
                    content: &m.content,
                })
                .collect(),
            stream,
        }
    }
}

/// Ollama chat response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: WireReply,
}

#[derive(Debug, Deserialize)]
struct WireReply {
    #[serde(default)]
    content: String,
}
