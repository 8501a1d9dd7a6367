//! HuggingFace inference endpoint (feature extraction)

use serde::{Deserialize, Serialize};

use crate::bridge::EmbeddingProvider;
use crate::error::AiError;

const PROVIDER: &str = "HuggingFace";

/// Error text the inference API uses when an input exceeds the model's window.
const TOO_LONG_MARKER: &str = "must have less than";

pub struct HuggingFaceProvider {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    dimensions: usize,
}

impl HuggingFaceProvider {
    pub fn new(url: impl Into<String>, token: Option<String>, dimensions: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            token,
            dimensions,
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, inputs: &T) -> Result<Embeddings, AiError> {
        let mut request = self
            .client
            .post(&self.url)
            .header("Accept", "application/json")
            .json(&InferenceRequest { inputs });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(AiError::http(PROVIDER))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), body));
        }
        response.json().await.map_err(AiError::decode(PROVIDER))
    }
}

#[derive(Serialize)]
struct InferenceRequest<'a, T: ?Sized> {
    inputs: &'a T,
}

/// A single input yields one vector; a list of inputs yields a list of vectors.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Embeddings {
    Single(Vec<f32>),
    Batch(Vec<Vec<f32>>),
}

impl Embeddings {
    fn into_batch(self) -> Vec<Vec<f32>> {
        match self {
            Embeddings::Single(vector) if vector.is_empty() => Vec::new(),
            Embeddings::Single(vector) => vec![vector],
            Embeddings::Batch(vectors) => vectors,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

fn classify_failure(status: u16, body: String) -> AiError {
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or_default();
    if status == 400 && message.contains(TOO_LONG_MARKER) {
        AiError::InputTooLong {
            provider: PROVIDER,
            message,
        }
    } else {
        AiError::Status {
            provider: PROVIDER,
            status,
            body,
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HuggingFaceProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        let mut vectors = self.post(text).await?.into_batch();
        match vectors.len() {
            0 => Err(AiError::EmptyEmbedding(PROVIDER)),
            _ => Ok(vectors.swap_remove(0)),
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.post(texts).await?.into_batch())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}
