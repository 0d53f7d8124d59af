//! Model collaborator
//!
//! The loop talks to the model only through [`ModelClient`]; the Ollama
//! client is the production implementation.

pub mod client;
pub mod messages;
pub mod stream;

pub use client::{OllamaClient, DEFAULT_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_REQUEST_TIMEOUT};
pub use messages::{ConversationState, Message, Role};
pub use stream::ChatStreamDecoder;

use crate::errors::Result;
use async_trait::async_trait;
use futures_util::stream::{self as futures_stream, BoxStream, StreamExt};

/// Reply text delivered piece by piece
pub type ReplyStream = BoxStream<'static, Result<String>>;

/// Produces one reply for a conversation
///
/// Any failure must be reported as `AgentError::Transport`.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, messages: &[Message]) -> Result<String>;

    /// Stream the reply as it is produced
    ///
    /// Clients without streaming support yield the whole reply as one piece.
    async fn generate_stream(&self, messages: &[Message]) -> Result<ReplyStream> {
        let reply = self.generate(messages).await?;
        Ok(futures_stream::once(async move { Ok(reply) }).boxed())
    }
}
