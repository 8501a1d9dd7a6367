//! Axum router setup for the Thicket server

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use crate::{
    ServerState,
    handlers::{chat, graph_empty, health_check, index_project, query, reset_graph},
};

/// Create the axum router with all routes
pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/api/query", post(query))
        .route("/api/chat", post(chat))
        .route("/api/index", post(index_project))
        .route("/api/graph/empty", get(graph_empty))
        .route("/api/graph/reset", post(reset_graph))
        .route("/api/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
