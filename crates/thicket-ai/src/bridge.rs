//! Provider contracts for embeddings and chat completion

use serde::{Deserialize, Serialize};

use crate::error::AiError;

/// Turns text into fixed-length vectors. Ingestion and query time must use the
/// same provider and model, or similarity scores are meaningless.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        match vectors.pop() {
            Some(vector) if !vector.is_empty() => Ok(vector),
            _ => Err(AiError::EmptyEmbedding(self.name())),
        }
    }

    /// Embed several texts; the result is index-aligned with the input.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError>;

    /// Length of every vector this provider returns.
    fn dimensions(&self) -> usize;

    fn name(&self) -> &'static str;
}

/// One turn of a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// LLM backend answering a conversation.
#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send the conversation and return the assistant's reply.
    async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String>;

    fn name(&self) -> &str;
}
