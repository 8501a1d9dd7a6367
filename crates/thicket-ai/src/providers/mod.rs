//! Embedding and chat provider implementations

pub mod huggingface;
pub mod local;
pub mod openai;

use std::sync::Arc;

use anyhow::Result;
use thicket_core::{EmbeddingsConfig, LlmConfig};

use crate::bridge::{ChatProvider, EmbeddingProvider};
use crate::error::AiError;

/// Build the configured embedding provider.
///
/// Fails when the provider name is unknown or an HTTP provider lacks its
/// endpoint or credentials; the local provider always succeeds.
pub fn create_embedding_provider(config: &EmbeddingsConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "huggingface" => {
            let url = config
                .url
                .clone()
                .ok_or_else(|| AiError::NotConfigured("embeddings url".to_string()))?;
            Ok(Arc::new(huggingface::HuggingFaceProvider::new(
                url,
                config.token.clone(),
                config.dim,
            )))
        }
        "openai" => {
            let key = config
                .token
                .clone()
                .ok_or_else(|| AiError::NotConfigured("embeddings token".to_string()))?;
            let mut provider = openai::OpenAIEmbeddingProvider::new(key, config.dim);
            if let Some(url) = &config.url {
                provider = provider.with_url(url.clone());
            }
            if let Some(model) = &config.model {
                provider = provider.with_model(model.clone());
            }
            Ok(Arc::new(provider))
        }
        "local" => Ok(Arc::new(local::LocalEmbeddingProvider::new(config.dim))),
        other => anyhow::bail!("Unknown embedding provider: {other}"),
    }
}

/// Build the configured chat provider.
pub fn create_chat_provider(config: &LlmConfig) -> Result<Arc<dyn ChatProvider>> {
    match config.provider.as_str() {
        "openai" => {
            let key = config
                .api_key
                .clone()
                .ok_or_else(|| AiError::NotConfigured("llm api key".to_string()))?;
            let mut provider = openai::OpenAIChatProvider::new(key, config.model.clone());
            if let Some(url) = &config.url {
                provider = provider.with_url(url.clone());
            }
            Ok(Arc::new(provider))
        }
        other => anyhow::bail!("Unknown chat provider: {other}"),
    }
}
