//! End-to-end tests: index a Java project, embed its methods, retrieve clusters

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use thicket_ai::providers::local::LocalEmbeddingProvider;
use thicket_ai::{EmbeddingJob, EmbeddingProvider, RetrievalEngine, prompt};
use thicket_core::{
    EdgeKind, GraphStore, MemoryGraphStore, NodeKey, NodeLabel, RelationshipPolicy, ThicketConfig, snapshot_path,
};
use thicket_indexer::Coordinator;

const LOAD: &str = "void load() { parse(); }";

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn sample_project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "src/main/java/app/Loader.java",
        &format!(
            "package app;\n\nimport app.model.Settings;\n\npublic class Loader {{\n    private Settings settings;\n\n    {LOAD}\n\n    void parse() {{ settings.apply(); }}\n}}\n"
        ),
    );
    write(
        dir.path(),
        "src/main/java/app/model/Settings.java",
        "package app.model;\n\npublic class Settings {\n    public void apply() {}\n}\n",
    );
    dir
}

fn local_config() -> ThicketConfig {
    let mut config = ThicketConfig::default();
    config.embeddings.provider = "local".to_string();
    config.embeddings.dim = 256;
    config
}

async fn indexed(root: &Path, config: &ThicketConfig) -> Arc<MemoryGraphStore> {
    let store = Arc::new(MemoryGraphStore::new());
    let report = Coordinator::new(store.clone(), config.indexer.clone())
        .index_project(root)
        .unwrap();
    assert_eq!(report.classes, 2);
    assert_eq!(report.methods, 3);

    let provider = Arc::new(LocalEmbeddingProvider::new(config.embeddings.dim));
    let embedded = EmbeddingJob::new(store.clone(), provider, config).run().await.unwrap();
    assert_eq!(embedded.embedded, 3);
    store
}

fn engine(store: Arc<MemoryGraphStore>, config: &ThicketConfig) -> RetrievalEngine {
    let provider: Arc<dyn EmbeddingProvider> = Arc::new(LocalEmbeddingProvider::new(config.embeddings.dim));
    RetrievalEngine::new(store, Some(provider), config.retrieval.clone())
}

#[tokio::test]
async fn query_returns_call_chain_around_best_match() {
    let project = sample_project();
    let config = local_config();
    let store = indexed(project.path(), &config).await;

    let result = engine(store.clone(), &config).query(LOAD, 1).await;
    assert_eq!(result.graph.len(), 1);
    assert_eq!(result.chat.len(), 1);

    let names: Vec<_> = result.chat[0]
        .nodes
        .iter()
        .filter_map(|node| node.properties.get("name").and_then(|v| v.as_str()))
        .collect();
    assert!(names.contains(&"app.Loader.load()"));
    assert!(names.contains(&"app.Loader.parse()"));
    assert!(names.contains(&"app.model.Settings.apply()"));

    assert!(result.chat[0].relationships.is_empty());
    assert!(result.graph[0].rels.is_empty());

    for node in &result.chat[0].nodes {
        assert!(!node.properties.contains_key("embedding"));
    }
}

#[tokio::test]
async fn relationship_policies_widen_the_reported_edges() {
    let project = sample_project();
    let mut config = local_config();
    let store = indexed(project.path(), &config).await;

    config.retrieval.relationships = RelationshipPolicy::Traversed;
    let traversed = engine(store.clone(), &config).query(LOAD, 1).await;
    // load -> parse -> apply
    assert_eq!(traversed.chat[0].relationships.len(), 2);
    assert!(traversed.chat[0].relationships.iter().all(|rel| rel.kind == EdgeKind::CallsMethod));
    assert_eq!(traversed.graph[0].rels.len(), 2);

    config.retrieval.relationships = RelationshipPolicy::Induced;
    let induced = engine(store, &config).query(LOAD, 1).await;
    assert_eq!(traversed.graph[0].nodes, induced.graph[0].nodes);
    assert!(induced.graph[0].rels.len() > traversed.graph[0].rels.len());
}

#[tokio::test]
async fn snapshot_survives_reload() {
    let project = sample_project();
    let config = local_config();
    let store = indexed(project.path(), &config).await;
    let path = snapshot_path(project.path());
    store.save(&path).unwrap();

    let reloaded = Arc::new(MemoryGraphStore::open(&path).unwrap());
    assert_eq!(reloaded.counts().unwrap(), store.counts().unwrap());
    assert!(reloaded.find(&NodeKey::method("app.Loader.load()")).unwrap().is_some());

    let before = engine(store, &config).query(LOAD, 2).await;
    let after = engine(reloaded, &config).query(LOAD, 2).await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn reindexing_is_idempotent() {
    let project = sample_project();
    let config = local_config();
    let store = indexed(project.path(), &config).await;
    let counts = store.counts().unwrap();

    Coordinator::new(store.clone(), config.indexer.clone())
        .index_project(project.path())
        .unwrap();
    assert_eq!(store.counts().unwrap(), counts);
}

#[tokio::test]
async fn digest_names_the_seed_method() {
    let project = sample_project();
    let config = local_config();
    let store = indexed(project.path(), &config).await;

    let result = engine(store, &config).query(LOAD, 1).await;
    let digest = prompt::digest_context(&result.chat, config.llm.tokens_per_request);
    assert!(digest.contains("app.Loader.load()"));
    // Stored code is the signature without its return type, then the body.
    assert!(digest.contains("load() {"));
    assert!(digest.contains("parse();"));
    assert!(!digest.contains(LOAD));
}

#[tokio::test]
async fn wiped_graph_answers_nothing() {
    let project = sample_project();
    let config = local_config();
    let store = indexed(project.path(), &config).await;

    store.wipe().unwrap();
    assert!(store.counts().unwrap().is_empty());
    assert!(store.scan(NodeLabel::Method, "code", 0, 10).unwrap().is_empty());

    let result = engine(store, &config).query(LOAD, 3).await;
    assert!(result.is_empty());
}
