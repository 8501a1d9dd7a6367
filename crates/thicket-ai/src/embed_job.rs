//! Background embedding of method source
//!
//! Recreates the method vector index, then pages through every `Method` that
//! carries `code` and writes an `embedding` onto it. A batch the provider
//! cannot embed is logged and skipped; only store failures stop the job.

use std::sync::Arc;

use serde::Serialize;
use thicket_core::{GraphStore, NodeLabel, StoreResult, ThicketConfig, VectorIndexDef};

use crate::bridge::EmbeddingProvider;
use crate::budget::truncate_to_tokens;
use crate::error::AiError;

pub const EMBEDDING_PROPERTY: &str = "embedding";
pub const CODE_PROPERTY: &str = "code";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmbeddingReport {
    pub methods: usize,
    pub embedded: usize,
    pub skipped_batches: usize,
    pub truncated_batches: usize,
}

pub struct EmbeddingJob {
    store: Arc<dyn GraphStore>,
    provider: Arc<dyn EmbeddingProvider>,
    index_name: String,
    batch_size: usize,
    tokens_per_embedding: usize,
}

impl EmbeddingJob {
    pub fn new(store: Arc<dyn GraphStore>, provider: Arc<dyn EmbeddingProvider>, config: &ThicketConfig) -> Self {
        Self {
            store,
            provider,
            index_name: config.retrieval.index_name.clone(),
            batch_size: config.embeddings.batch_size.max(1),
            tokens_per_embedding: config.embeddings.tokens_per_embedding,
        }
    }

    pub async fn run(&self) -> StoreResult<EmbeddingReport> {
        let dimensions = self.provider.dimensions();
        if self.store.drop_vector_index(&self.index_name)? {
            tracing::debug!("Dropped vector index {}", self.index_name);
        }
        self.store.create_vector_index(VectorIndexDef::new(
            &self.index_name,
            NodeLabel::Method,
            EMBEDDING_PROPERTY,
            dimensions,
        ))?;
        tracing::info!(
            "Embedding methods with {} ({dimensions} dimensions, batches of {})",
            self.provider.name(),
            self.batch_size
        );

        let mut report = EmbeddingReport::default();
        let mut skip = 0;
        loop {
            let batch = self.store.scan(NodeLabel::Method, CODE_PROPERTY, skip, self.batch_size)?;
            if batch.is_empty() {
                break;
            }
            skip += batch.len();
            report.methods += batch.len();

            let codes: Vec<String> = batch
                .iter()
                .map(|node| {
                    node.properties
                        .get(CODE_PROPERTY)
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string()
                })
                .collect();

            let vectors = match self.embed(&codes, &mut report).await {
                Some(vectors) if vectors.len() == batch.len() && vectors.iter().all(|v| v.len() == dimensions) => {
                    vectors
                }
                Some(vectors) => {
                    tracing::warn!(
                        "Embedding count mismatch for methods {}..{} ({} vectors for {} methods); skipping batch",
                        skip - batch.len(),
                        skip,
                        vectors.len(),
                        batch.len()
                    );
                    report.skipped_batches += 1;
                    continue;
                }
                None => {
                    report.skipped_batches += 1;
                    continue;
                }
            };

            for (node, vector) in batch.iter().zip(vectors) {
                self.store.set_property(node.id, EMBEDDING_PROPERTY, vector.into())?;
                report.embedded += 1;
            }
            tracing::info!("Embedded methods {}..{}", skip - batch.len(), skip);

            if batch.len() < self.batch_size {
                break;
            }
        }

        tracing::info!(
            "Embedding finished: {} of {} methods, {} batches skipped",
            report.embedded,
            report.methods,
            report.skipped_batches
        );
        Ok(report)
    }

    /// Embed one batch, retrying once with truncated inputs if the provider
    /// rejects them as too long.
    async fn embed(&self, codes: &[String], report: &mut EmbeddingReport) -> Option<Vec<Vec<f32>>> {
        match self.provider.embed_batch(codes).await {
            Ok(vectors) => Some(vectors),
            Err(AiError::InputTooLong { message, .. }) => {
                tracing::debug!("Truncating batch to {} tokens: {message}", self.tokens_per_embedding);
                report.truncated_batches += 1;
                let truncated: Vec<String> = codes
                    .iter()
                    .map(|code| truncate_to_tokens(code, self.tokens_per_embedding).to_string())
                    .collect();
                match self.provider.embed_batch(&truncated).await {
                    Ok(vectors) => Some(vectors),
                    Err(err) => {
                        tracing::warn!("Embedding failed after truncation: {err}");
                        None
                    }
                }
            }
            Err(err) => {
                tracing::warn!("Embedding failed: {err}");
                None
            }
        }
    }
}

/// Run the job on the tokio runtime. The caller is not told how it went beyond
/// `then`, which receives the report of a job that reached the end.
pub fn spawn_embedding_job<F>(job: EmbeddingJob, then: F) -> tokio::task::JoinHandle<()>
where
    F: FnOnce(&EmbeddingReport) + Send + 'static,
{
    tokio::spawn(async move {
        match job.run().await {
            Ok(report) => then(&report),
            Err(err) => tracing::error!("Embedding job failed: {err}"),
        }
    })
}
