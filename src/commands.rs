//! CLI command implementations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use thicket_ai::{EmbeddingJob, RetrievalEngine, create_embedding_provider};
use thicket_core::{GraphStore, MemoryGraphStore, NodeLabel, ThicketConfig};
use thicket_indexer::Coordinator;
use thicket_server::{ServerConfig, ServerState, ThicketServer};

/// Configuration and persisted graph for a project root.
struct Project {
    root: PathBuf,
    config: ThicketConfig,
    store: Arc<MemoryGraphStore>,
}

impl Project {
    fn open(root: &Path) -> anyhow::Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("Project root {} does not exist", root.display()))?;
        let config = ThicketConfig::load(&root);
        let snapshot = config.snapshot_path(&root);
        let store = MemoryGraphStore::open(&snapshot)
            .with_context(|| format!("Failed to load graph from {}", snapshot.display()))?;
        Ok(Self {
            root,
            config,
            store: Arc::new(store),
        })
    }

    fn save(&self) -> anyhow::Result<()> {
        let snapshot = self.config.snapshot_path(&self.root);
        self.store
            .save(&snapshot)
            .with_context(|| format!("Failed to save graph to {}", snapshot.display()))?;
        tracing::info!("Saved graph to {}", snapshot.display());
        Ok(())
    }

    async fn embed(&self) -> anyhow::Result<()> {
        let provider = create_embedding_provider(&self.config.embeddings).context("Embeddings are not configured")?;
        let report = EmbeddingJob::new(self.store.clone(), provider, &self.config).run().await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}

pub async fn index(root: PathBuf, embed: bool) -> anyhow::Result<()> {
    let project = Project::open(&root)?;
    tracing::info!("Indexing project: {}", project.root.display());

    let coordinator = Coordinator::new(project.store.clone(), project.config.indexer.clone());
    let report = coordinator.index_project(&project.root)?;
    project.save()?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if embed {
        project.embed().await?;
        project.save()?;
    }
    Ok(())
}

pub async fn embed(root: PathBuf) -> anyhow::Result<()> {
    let project = Project::open(&root)?;
    project.embed().await?;
    project.save()
}

pub async fn query(root: PathBuf, text: String, top_n: Option<usize>) -> anyhow::Result<()> {
    let project = Project::open(&root)?;
    let embedder = create_embedding_provider(&project.config.embeddings)
        .inspect_err(|err| tracing::warn!("Embeddings disabled: {err}"))
        .ok();
    let top_n = top_n.unwrap_or(project.config.retrieval.top_n);
    let engine = RetrievalEngine::new(project.store.clone(), embedder, project.config.retrieval.clone());

    let result = engine.query(&text, top_n).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub fn reset(root: PathBuf) -> anyhow::Result<()> {
    let project = Project::open(&root)?;
    project.store.wipe()?;
    project.save()?;
    tracing::info!("Graph reset");
    Ok(())
}

pub fn stats(root: PathBuf) -> anyhow::Result<()> {
    let project = Project::open(&root)?;
    let counts = project.store.counts()?;
    let mut labels = serde_json::Map::new();
    for label in NodeLabel::ALL {
        let count = project.store.scan(label, label.key_property(), 0, usize::MAX)?.len();
        labels.insert(label.to_string(), count.into());
    }
    let stats = serde_json::json!({
        "nodes": counts.nodes,
        "relationships": counts.relationships,
        "labels": labels,
    });
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

pub async fn serve(root: PathBuf, host: String, port: u16) -> anyhow::Result<()> {
    let project = Project::open(&root)?;
    tracing::info!("Starting Thicket server on {}:{}", host, port);

    let state = ServerState::new(project.store, project.config, project.root);
    let server = ThicketServer::new(state, ServerConfig { host, port });
    server.start().await
}
