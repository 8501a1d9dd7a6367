//! REST API handlers for the Thicket server

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thicket_ai::{ChatMessage, EmbeddingJob, prompt, spawn_embedding_job};
use thicket_core::GraphStore;
use thicket_indexer::{Coordinator, IndexReport};

use crate::ServerState;

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, message.into()).into_response()
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default, rename = "topN")]
    pub top_n: Option<usize>,
}

/// Retrieve clusters for a natural-language prompt.
pub async fn query(State(state): State<Arc<ServerState>>, Json(request): Json<QueryRequest>) -> Response {
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return error(StatusCode::BAD_REQUEST, "Missing or empty 'prompt'");
    }
    let top_n = request.top_n.unwrap_or(state.config.retrieval.top_n);
    Json(state.engine.query(prompt, top_n).await).into_response()
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// When present, clusters retrieved for this text are prepended as context.
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Forward a conversation to the configured LLM.
pub async fn chat(State(state): State<Arc<ServerState>>, Json(request): Json<ChatRequest>) -> Response {
    let Some(provider) = state.chat.clone() else {
        return error(StatusCode::SERVICE_UNAVAILABLE, "No chat provider configured");
    };

    let messages = match request.query.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => {
            let clusters = state.engine.query(text, state.config.retrieval.top_n).await;
            prompt::with_context(&clusters.chat, state.config.llm.tokens_per_request, &request.messages)
        }
        _ => request.messages,
    };

    match provider.complete(&messages).await {
        Ok(reply) => Json(ChatResponse { reply }).into_response(),
        Err(err) => {
            tracing::error!("Chat completion failed: {err:#}");
            error(StatusCode::BAD_GATEWAY, "Chat provider request failed")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IndexRequest {
    #[serde(rename = "projectRoot")]
    pub project_root: String,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub report: IndexReport,
    pub embedding: bool,
}

/// Index a project, persist the graph, then start embedding in the background.
pub async fn index_project(State(state): State<Arc<ServerState>>, Json(request): Json<IndexRequest>) -> Response {
    let root = PathBuf::from(request.project_root.trim());
    if request.project_root.trim().is_empty() || !root.is_dir() {
        return error(StatusCode::BAD_REQUEST, "'projectRoot' must be an existing directory");
    }

    let store: Arc<dyn GraphStore> = state.store.clone();
    let indexer_config = state.config.indexer.clone();
    let outcome = tokio::task::spawn_blocking(move || Coordinator::new(store, indexer_config).index_project(&root)).await;
    let report = match outcome {
        Ok(Ok(report)) => report,
        Ok(Err(err)) => {
            tracing::error!("Indexing failed: {err}");
            return error(StatusCode::INTERNAL_SERVER_ERROR, format!("Indexing failed: {err}"));
        }
        Err(err) => {
            tracing::error!("Indexing task panicked: {err}");
            return error(StatusCode::INTERNAL_SERVER_ERROR, "Indexing failed");
        }
    };
    if let Err(err) = state.persist().await {
        tracing::error!("Snapshot task failed: {err}");
    }

    let embedding = match &state.embedder {
        Some(provider) => {
            let job = EmbeddingJob::new(state.store.clone(), provider.clone(), &state.config);
            let after = Arc::clone(&state);
            spawn_embedding_job(job, move |_| {
                after.persist();
            });
            true
        }
        None => {
            tracing::warn!("No embedding provider configured; skipping embedding");
            false
        }
    };

    (StatusCode::ACCEPTED, Json(IndexResponse { report, embedding })).into_response()
}

/// Whether the graph has no nodes.
pub async fn graph_empty(State(state): State<Arc<ServerState>>) -> Response {
    match state.store.counts() {
        Ok(counts) => Json(serde_json::json!({ "isEmpty": counts.is_empty() })).into_response(),
        Err(err) => error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

/// Remove every node, relationship and vector index, and persist the empty graph.
pub async fn reset_graph(State(state): State<Arc<ServerState>>) -> Response {
    match state.store.wipe() {
        Ok(()) => {
            if let Err(err) = state.persist().await {
                tracing::error!("Snapshot task failed: {err}");
            }
            tracing::info!("Graph reset");
            "Graph has been reset successfully.".into_response()
        }
        Err(err) => error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store: bool,
    pub embeddings: bool,
    pub chat: bool,
}

pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.store.probe().is_ok(),
        embeddings: state.embedder.is_some(),
        chat: state.chat.is_some(),
    })
}
