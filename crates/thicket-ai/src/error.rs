//! Provider and retrieval errors

use thicket_core::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("request to {provider} failed: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("input rejected by {provider} as too long: {message}")]
    InputTooLong { provider: &'static str, message: String },

    #[error("{0} returned an empty embedding")]
    EmptyEmbedding(&'static str),

    #[error("unexpected response from {provider}: {message}")]
    Decode { provider: &'static str, message: String },
}

impl AiError {
    pub(crate) fn http(provider: &'static str) -> impl FnOnce(reqwest::Error) -> AiError {
        move |source| AiError::Http { provider, source }
    }

    pub(crate) fn decode(provider: &'static str) -> impl FnOnce(reqwest::Error) -> AiError {
        move |err| AiError::Decode {
            provider,
            message: err.to_string(),
        }
    }
}

/// Why a retrieval call produced nothing. `RetrievalEngine::query` logs these and
/// answers with an empty result; `try_query` surfaces them.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("malformed query: {0}")]
    MalformedInput(String),

    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error(transparent)]
    Store(StoreError),

    #[error("query embedding failed: {0}")]
    Embedding(#[from] AiError),

    /// The query vector does not fit the index: the embedding model differs from
    /// the one used at ingestion.
    #[error("embedding dimension mismatch: index `{index}` holds {expected}-dimensional vectors, query has {actual}")]
    Configuration {
        index: String,
        expected: usize,
        actual: usize,
    },
}

impl From<StoreError> for RetrievalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DimensionMismatch { index, expected, actual } => {
                RetrievalError::Configuration { index, expected, actual }
            }
            StoreError::UnknownIndex(name) => RetrievalError::NotConfigured(format!("vector index `{name}`")),
            other => RetrievalError::Store(other),
        }
    }
}
