//! HTTP server over the graph store, indexer and retrieval engine

pub mod handlers;
pub mod router;

use std::path::PathBuf;
use std::sync::Arc;

use thicket_ai::{ChatProvider, EmbeddingProvider, RetrievalEngine, create_chat_provider, create_embedding_provider};
use thicket_core::{MemoryGraphStore, ThicketConfig};
use tokio::task::JoinHandle;

pub use router::create_router;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Everything a request handler may touch.
pub struct ServerState {
    pub store: Arc<MemoryGraphStore>,
    pub config: ThicketConfig,
    /// Project root the snapshot path is resolved against.
    pub root: PathBuf,
    pub engine: RetrievalEngine,
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
    pub chat: Option<Arc<dyn ChatProvider>>,
}

impl ServerState {
    /// Build state with providers taken from configuration. A provider that cannot
    /// be built is logged and left out; the routes needing it degrade.
    pub fn new(store: Arc<MemoryGraphStore>, config: ThicketConfig, root: PathBuf) -> Self {
        let embedder = create_embedding_provider(&config.embeddings)
            .inspect_err(|err| tracing::warn!("Embeddings disabled: {err}"))
            .ok();
        let chat = create_chat_provider(&config.llm)
            .inspect_err(|err| tracing::warn!("Chat disabled: {err}"))
            .ok();
        Self::with_providers(store, config, root, embedder, chat)
    }

    pub fn with_providers(
        store: Arc<MemoryGraphStore>,
        config: ThicketConfig,
        root: PathBuf,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        chat: Option<Arc<dyn ChatProvider>>,
    ) -> Self {
        let engine = RetrievalEngine::new(store.clone(), embedder.clone(), config.retrieval.clone());
        Self {
            store,
            config,
            root,
            engine,
            embedder,
            chat,
        }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.config.snapshot_path(&self.root)
    }

    /// Persist the graph on the blocking pool; failures are logged only.
    ///
    /// Must be called from within a tokio runtime. Dropping the handle leaves
    /// the write running.
    pub fn persist(&self) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let path = self.snapshot_path();
        tokio::task::spawn_blocking(move || {
            if let Err(err) = store.save(&path) {
                tracing::error!("Failed to save graph to {}: {err}", path.display());
            }
        })
    }
}

pub struct ThicketServer {
    state: Arc<ServerState>,
    config: ServerConfig,
}

impl ThicketServer {
    pub fn new(state: ServerState, config: ServerConfig) -> Self {
        Self {
            state: Arc::new(state),
            config,
        }
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    pub async fn start(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Listening on http://{}", listener.local_addr()?);
        axum::serve(listener, create_router(self.state)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use thicket_core::{GraphStore, NodeKey, Properties};

    use super::*;

    #[tokio::test]
    async fn persist_writes_a_loadable_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryGraphStore::new());
        store.merge_node(&NodeKey::class("app.Loader"), Properties::new()).unwrap();
        let state = ServerState::with_providers(store, ThicketConfig::default(), dir.path().to_path_buf(), None, None);

        state.persist().await.unwrap();

        let reloaded = MemoryGraphStore::open(&state.snapshot_path()).unwrap();
        assert_eq!(reloaded.counts().unwrap().nodes, 1);
        assert!(reloaded.find(&NodeKey::class("app.Loader")).unwrap().is_some());
    }
}
