//! OpenAI-compatible embeddings and chat completions

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::bridge::{ChatMessage, ChatProvider, EmbeddingProvider};
use crate::error::AiError;

const PROVIDER: &str = "OpenAI";
const EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbeddingProvider {
    pub fn new(api_key: String, dimensions: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: EMBEDDINGS_URL.to_string(),
            api_key,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions,
        }
    }

    pub fn with_url(mut self, url: String) -> Self {
        self.url = url;
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

fn is_context_overflow(body: &str) -> bool {
    body.contains("maximum context length") || body.contains("context_length_exceeded")
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(AiError::http(PROVIDER))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(if status.as_u16() == 400 && is_context_overflow(&body) {
                AiError::InputTooLong {
                    provider: PROVIDER,
                    message: body,
                }
            } else {
                AiError::Status {
                    provider: PROVIDER,
                    status: status.as_u16(),
                    body,
                }
            });
        }

        let mut parsed: EmbeddingResponse = response.json().await.map_err(AiError::decode(PROVIDER))?;
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

pub struct OpenAIChatProvider {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl OpenAIChatProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: CHAT_URL.to_string(),
            api_key,
            model,
        }
    }

    pub fn with_url(mut self, url: String) -> Self {
        self.url = url;
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[async_trait::async_trait]
impl ChatProvider for OpenAIChatProvider {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                messages,
            })
            .send()
            .await
            .context("Failed to send request to OpenAI")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error {status}: {error_text}");
        }

        let parsed: ChatResponse = response.json().await.context("Failed to parse OpenAI response")?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .context("OpenAI response contained no choices")?;
        Ok(choice.message.content)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
