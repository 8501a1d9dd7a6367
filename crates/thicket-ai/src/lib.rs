//! Embeddings, chat and graph-aware retrieval for Thicket
//!
//! This crate turns a natural-language question into clusters of related code:
//! the question is embedded, the nearest methods are found through the vector
//! index, and each seed is widened along the property graph before being
//! hydrated into a form an LLM can read.

pub mod bridge;
pub mod budget;
pub mod embed_job;
pub mod error;
pub mod patterns;
pub mod prompt;
pub mod providers;
pub mod retrieval;

#[cfg(test)]
pub mod tests;

pub use bridge::{ChatMessage, ChatProvider, EmbeddingProvider};
pub use embed_job::{EmbeddingJob, EmbeddingReport, spawn_embedding_job};
pub use error::{AiError, RetrievalError};
pub use patterns::{TraversalPattern, default_patterns};
pub use providers::{create_chat_provider, create_embedding_provider};
pub use retrieval::{Cluster, ClusterDetail, ClusterIds, IdRef, QueryResult, RetrievalEngine};
