//! Retrieval and embedding-job scenarios over an in-memory graph

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use thicket_core::{
    EdgeKind, GraphStore, GraphWriter, MemoryGraphStore, MethodDetail, NodeKey, NodeLabel, RelationshipPolicy,
    RetrievalConfig, ThicketConfig, VectorIndexDef,
};

use crate::bridge::EmbeddingProvider;
use crate::embed_job::{EMBEDDING_PROPERTY, EmbeddingJob};
use crate::error::{AiError, RetrievalError};
use crate::patterns::{NEARBY_METHODS_CAP, NEIGHBOURHOOD_CAP, nearby_methods, neighbourhood};
use crate::providers::local::LocalEmbeddingProvider;
use crate::retrieval::RetrievalEngine;

const INDEX: &str = "methodEmbeddings";

/// Embeds known texts to fixed vectors and everything else to the zero vector.
struct FixedEmbeddings {
    dimensions: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl FixedEmbeddings {
    fn new(dimensions: usize, entries: &[(&str, Vec<f32>)]) -> Self {
        Self {
            dimensions,
            vectors: entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for FixedEmbeddings {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError> {
        Ok(texts
            .iter()
            .map(|t| self.vectors.get(t).cloned().unwrap_or_else(|| vec![0.0; self.dimensions]))
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

fn detail(simple_name: &str, code: &str, line: u32) -> MethodDetail {
    MethodDetail {
        simple_name: simple_name.to_string(),
        file: "/p/Loader.java".to_string(),
        start_line: line,
        end_line: line + 2,
        code: code.to_string(),
    }
}

fn embed(store: &MemoryGraphStore, signature: &str, vector: Vec<f32>) {
    let id = store.find(&NodeKey::method(signature)).unwrap().unwrap();
    store.set_property(id, EMBEDDING_PROPERTY, vector.into()).unwrap();
}

/// Three methods whose similarity to `[1, 0, 0]` is 0.91, 0.85 and 0.10.
fn config_graph() -> Arc<MemoryGraphStore> {
    let store = Arc::new(MemoryGraphStore::new());
    let writer = GraphWriter::new(store.clone());
    writer.insert_class("app.Settings", "class");
    writer.insert_class("app.ClassA", "class");
    writer.insert_method("app.Settings.loadConfig()", &detail("loadConfig()", "loadConfig() {}", 3));
    writer.insert_method("app.Settings.parseYaml()", &detail("parseYaml()", "parseYaml() {}", 7));
    writer.insert_method("app.ClassA.helper()", &detail("helper()", "helper() {}", 2));
    writer.class_to_method("app.Settings", "app.Settings.loadConfig()");
    writer.class_to_method("app.Settings", "app.Settings.parseYaml()");
    writer.class_to_method("app.ClassA", "app.ClassA.helper()");
    writer.method_calls_method("app.Settings.loadConfig()", "app.Settings.parseYaml()");
    writer.method_uses_class("app.ClassA.helper()", "app.Settings");

    store
        .create_vector_index(VectorIndexDef::new(INDEX, NodeLabel::Method, EMBEDDING_PROPERTY, 3))
        .unwrap();
    embed(&store, "app.Settings.loadConfig()", vec![0.91, (1.0_f32 - 0.91 * 0.91).sqrt(), 0.0]);
    embed(&store, "app.Settings.parseYaml()", vec![0.85, 0.0, (1.0_f32 - 0.85 * 0.85).sqrt()]);
    embed(&store, "app.ClassA.helper()", vec![0.10, (1.0_f32 - 0.01).sqrt(), 0.0]);
    store
}

fn engine(store: Arc<MemoryGraphStore>, config: RetrievalConfig) -> RetrievalEngine {
    let provider = FixedEmbeddings::new(3, &[("parse configuration file", vec![1.0, 0.0, 0.0])]);
    RetrievalEngine::new(store, Some(Arc::new(provider)), config)
}

fn method_name(store: &MemoryGraphStore, id: thicket_core::NodeId) -> String {
    let nodes = store.hydrate_nodes(&[id]).unwrap();
    nodes[0].properties["name"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn seeds_follow_similarity_and_each_yields_one_cluster() {
    let store = config_graph();
    let engine = engine(store.clone(), RetrievalConfig::default());

    let seeds = engine.seeds(&[1.0, 0.0, 0.0], 2).unwrap();
    let names: Vec<_> = seeds.iter().map(|s| method_name(&store, s.id)).collect();
    assert_eq!(names, ["app.Settings.loadConfig()", "app.Settings.parseYaml()"]);
    assert!((seeds[0].score - 0.91).abs() < 1e-4);
    assert!(seeds.windows(2).all(|w| w[0].score >= w[1].score));

    let result = engine.query("parse configuration file", 2).await;
    assert_eq!(result.graph.len(), 2);
    assert_eq!(result.chat.len(), 2);
    for (seed, cluster) in seeds.iter().zip(&result.chat) {
        let node = cluster.nodes.iter().find(|n| n.id == seed.id).unwrap();
        assert_eq!(node.labels, ["Method"]);
        assert!(node.properties.contains_key("code"));
        assert!(!node.properties.contains_key("embedding"));
    }
}

#[tokio::test]
async fn clusters_contain_their_seed_and_hydrate_each_id_once() {
    let store = config_graph();
    let engine = engine(store.clone(), RetrievalConfig::default());

    for seed in engine.seeds(&[1.0, 0.0, 0.0], 3).unwrap() {
        let cluster = engine.expand(seed.id).unwrap();
        assert!(cluster.nodes.contains(&seed.id));

        let detail = engine.hydrate(&cluster).unwrap();
        let hydrated: Vec<_> = detail.nodes.iter().map(|n| n.id).collect();
        assert_eq!(hydrated, cluster.nodes);
        for node in &detail.nodes {
            for hidden in ["embedding", "start_line", "end_line"] {
                assert!(!node.properties.contains_key(hidden));
            }
        }
    }
}

fn relationship_kinds(store: &Arc<MemoryGraphStore>, seed: thicket_core::NodeId, policy: RelationshipPolicy) -> Vec<EdgeKind> {
    let engine = engine(
        store.clone(),
        RetrievalConfig {
            relationships: policy,
            ..RetrievalConfig::default()
        },
    );
    let cluster = engine.expand(seed).unwrap();
    engine.hydrate(&cluster).unwrap().relationships.iter().map(|r| r.kind).collect()
}

#[test]
fn relationship_policy_decides_what_clusters_carry() {
    let store = config_graph();
    let load = store.find(&NodeKey::method("app.Settings.loadConfig()")).unwrap().unwrap();

    assert!(relationship_kinds(&store, load, RelationshipPolicy::Omitted).is_empty());
    assert_eq!(
        relationship_kinds(&store, load, RelationshipPolicy::Traversed),
        [EdgeKind::CallsMethod]
    );

    let induced = relationship_kinds(&store, load, RelationshipPolicy::Induced);
    assert!(induced.contains(&EdgeKind::HasMethod));
    assert!(induced.contains(&EdgeKind::CallsMethod));
}

#[test]
fn nearby_methods_take_the_closest_ten_excluding_the_seed() {
    let store = Arc::new(MemoryGraphStore::new());
    let writer = GraphWriter::new(store.clone());
    let hub = "app.Hub.run()";
    writer.insert_method(hub, &detail("run()", "run() {}", 1));
    let near: Vec<_> = (0..6).map(|i| format!("app.Near.m{i}()")).collect();
    for callee in &near {
        writer.method_calls_method(hub, callee);
    }
    writer.method_calls_method(hub, hub);
    // A class one hop away whose methods sit two hops from the hub.
    writer.method_uses_class(hub, "app.Far");
    let far: Vec<_> = (0..6).map(|i| format!("app.Far.f{i}()")).collect();
    for method in &far {
        writer.insert_method(method, &detail("f()", "f() {}", 1));
        writer.class_to_method("app.Far", method);
    }
    let seed = store.find(&NodeKey::method(hub)).unwrap().unwrap();

    let engine = RetrievalEngine::new(store.clone(), None, RetrievalConfig::default()).with_patterns(vec![nearby_methods()]);
    let cluster = engine.expand(seed).unwrap();
    assert_eq!(cluster.nodes.len(), NEARBY_METHODS_CAP);
    assert!(!cluster.nodes.contains(&seed));

    let nodes = engine.hydrate(&cluster).unwrap().nodes;
    assert!(nodes.iter().all(|n| n.labels == ["Method"]));
    let names: Vec<_> = nodes.iter().map(|n| n.properties["name"].as_str().unwrap()).collect();
    let expected: Vec<_> = near.iter().chain(&far[..4]).map(String::as_str).collect();
    assert_eq!(names, expected);
}

#[test]
fn neighbourhood_pattern_is_capped() {
    let store = Arc::new(MemoryGraphStore::new());
    let writer = GraphWriter::new(store.clone());
    writer.insert_method("hub.Hub.run()", &detail("run()", "run() {}", 1));
    for i in 0..50 {
        writer.method_uses_class("hub.Hub.run()", &format!("hub.Used{i}"));
    }
    let hub = store.find(&NodeKey::method("hub.Hub.run()")).unwrap().unwrap();

    let capped = RetrievalEngine::new(store.clone(), None, RetrievalConfig::default()).with_patterns(vec![neighbourhood()]);
    assert_eq!(capped.expand(hub).unwrap().nodes.len(), NEIGHBOURHOOD_CAP);

    let full = RetrievalEngine::new(store, None, RetrievalConfig::default());
    let cluster = full.expand(hub).unwrap();
    assert!(cluster.nodes.len() <= NEIGHBOURHOOD_CAP + 1);
    assert!(cluster.nodes.contains(&hub));
}

#[tokio::test]
async fn disconnected_store_degrades_to_empty_result() {
    let store = config_graph();
    store.disconnect();
    let engine = engine(store.clone(), RetrievalConfig::default());

    let result = engine.query("parse configuration file", 2).await;
    assert!(result.is_empty());
    assert_eq!(serde_json::to_value(&result).unwrap(), serde_json::json!({"graph": [], "chat": []}));

    let err = engine.try_query("parse configuration file", 2).await.unwrap_err();
    assert!(matches!(err, RetrievalError::Store(e) if e.is_unavailable()));
}

#[tokio::test]
async fn preconditions_short_circuit() {
    let store = config_graph();

    let unconfigured = RetrievalEngine::new(store.clone(), None, RetrievalConfig::default());
    assert!(matches!(
        unconfigured.try_query("anything", 5).await,
        Err(RetrievalError::NotConfigured(_))
    ));
    assert!(unconfigured.query("anything", 5).await.is_empty());

    let configured = engine(store.clone(), RetrievalConfig::default());
    assert!(matches!(
        configured.try_query("   ", 5).await,
        Err(RetrievalError::MalformedInput(_))
    ));
    assert!(configured.try_query("parse configuration file", 0).await.unwrap().is_empty());

    let missing_index = engine(
        store,
        RetrievalConfig {
            index_name: "nope".into(),
            ..RetrievalConfig::default()
        },
    );
    assert!(matches!(
        missing_index.try_query("parse configuration file", 2).await,
        Err(RetrievalError::NotConfigured(_))
    ));
}

#[tokio::test]
async fn mismatched_query_dimensions_are_a_configuration_error() {
    let store = config_graph();
    let provider = FixedEmbeddings::new(2, &[]);
    let engine = RetrievalEngine::new(store, Some(Arc::new(provider)), RetrievalConfig::default());

    let err = engine.try_query("parse configuration file", 2).await.unwrap_err();
    assert!(matches!(
        err,
        RetrievalError::Configuration {
            expected: 3,
            actual: 2,
            ..
        }
    ));
}

#[tokio::test]
async fn wire_shape() {
    let store = Arc::new(MemoryGraphStore::new());
    let writer = GraphWriter::new(store.clone());
    writer.insert_class("app.Loader", "class");
    writer.insert_method("app.Loader.load()", &detail("load()", "load() {}", 4));
    writer.class_to_method("app.Loader", "app.Loader.load()");
    writer.insert_method(
        "app.Loader.parse(java.lang.String)",
        &detail("parse()", "parse(String) {}", 8),
    );
    writer.class_to_method("app.Loader", "app.Loader.parse(java.lang.String)");
    writer.method_calls_method("app.Loader.load()", "app.Loader.parse(java.lang.String)");
    store
        .create_vector_index(VectorIndexDef::new(INDEX, NodeLabel::Method, EMBEDDING_PROPERTY, 2))
        .unwrap();
    embed(&store, "app.Loader.load()", vec![1.0, 0.0]);
    embed(&store, "app.Loader.parse(java.lang.String)", vec![0.0, 1.0]);

    let provider = FixedEmbeddings::new(2, &[("where is loading done", vec![1.0, 0.0])]);
    let engine = RetrievalEngine::new(store, Some(Arc::new(provider)), RetrievalConfig::default());
    let result = engine.query("where is loading done", 1).await;

    insta::assert_json_snapshot!(result, @r#"
    {
      "graph": [
        {
          "nodes": [
            {
              "id": "2"
            },
            {
              "id": "0"
            },
            {
              "id": "1"
            }
          ],
          "rels": []
        }
      ],
      "chat": [
        {
          "nodes": [
            {
              "id": 2,
              "labels": [
                "Method"
              ],
              "properties": {
                "code": "parse(String) {}",
                "file": "/p/Loader.java",
                "name": "app.Loader.parse(java.lang.String)",
                "simple_name": "parse()"
              }
            },
            {
              "id": 0,
              "labels": [
                "Class"
              ],
              "properties": {
                "kind": "class",
                "name": "app.Loader"
              }
            },
            {
              "id": 1,
              "labels": [
                "Method"
              ],
              "properties": {
                "code": "load() {}",
                "file": "/p/Loader.java",
                "name": "app.Loader.load()",
                "simple_name": "load()"
              }
            }
          ],
          "relationships": []
        }
      ]
    }
    "#);
}

// ── Embedding job ───────────────────────────────────────────

fn job_config(batch_size: usize, tokens_per_embedding: usize) -> ThicketConfig {
    let mut config = ThicketConfig::default();
    config.embeddings.batch_size = batch_size;
    config.embeddings.tokens_per_embedding = tokens_per_embedding;
    config
}

fn methods_store(count: usize) -> Arc<MemoryGraphStore> {
    let store = Arc::new(MemoryGraphStore::new());
    let writer = GraphWriter::new(store.clone());
    for i in 0..count {
        let signature = format!("app.Worker.step{i}()");
        writer.insert_method(&signature, &detail(&format!("step{i}()"), &format!("step{i}() {{ work(); }}"), 1));
        writer.method_calls_method(&signature, "app.Worker.work()");
    }
    store
}

fn embedded_count(store: &MemoryGraphStore) -> usize {
    store
        .scan(NodeLabel::Method, EMBEDDING_PROPERTY, 0, usize::MAX)
        .unwrap()
        .len()
}

#[tokio::test]
async fn job_embeds_every_method_with_code_in_batches() {
    let store = methods_store(7);
    let provider = Arc::new(LocalEmbeddingProvider::new(256));
    let job = EmbeddingJob::new(store.clone(), provider.clone(), &job_config(3, 256));

    let report = job.run().await.unwrap();
    assert_eq!(report.methods, 7);
    assert_eq!(report.embedded, 7);
    assert_eq!(report.skipped_batches, 0);
    // The callee stub has no code and stays unembedded.
    assert_eq!(embedded_count(&store), 7);

    let engine = RetrievalEngine::new(store.clone(), Some(provider), RetrievalConfig::default());
    let result = engine.query("step3() { work(); }", 1).await;
    let cluster = &result.chat[0].nodes;
    assert!(cluster.iter().any(|n| n.properties["name"] == "app.Worker.step3()"));
}

#[tokio::test]
async fn rerunning_the_job_recreates_the_index() {
    let store = methods_store(2);
    let job = EmbeddingJob::new(store.clone(), Arc::new(LocalEmbeddingProvider::new(8)), &job_config(30, 256));
    job.run().await.unwrap();

    let wider = EmbeddingJob::new(store.clone(), Arc::new(LocalEmbeddingProvider::new(12)), &job_config(30, 256));
    wider.run().await.unwrap();
    assert!(store.nearest(INDEX, &[0.0; 8], 1).is_err());
    assert_eq!(store.nearest(INDEX, &[1.0; 12], 5).unwrap().len(), 2);
}

/// Rejects any input longer than `max_chars` as too long.
struct LengthLimited {
    max_chars: usize,
    calls: AtomicUsize,
    inner: LocalEmbeddingProvider,
}

#[async_trait::async_trait]
impl EmbeddingProvider for LengthLimited {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if texts.iter().any(|t| t.chars().count() > self.max_chars) {
            return Err(AiError::InputTooLong {
                provider: "limited",
                message: format!("inputs must have less than {} chars", self.max_chars),
            });
        }
        self.inner.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &'static str {
        "limited"
    }
}

#[tokio::test]
async fn too_long_batches_are_retried_truncated() {
    let store = methods_store(2);
    let provider = Arc::new(LengthLimited {
        max_chars: 8,
        calls: AtomicUsize::new(0),
        inner: LocalEmbeddingProvider::new(8),
    });
    let report = EmbeddingJob::new(store.clone(), provider.clone(), &job_config(30, 2))
        .run()
        .await
        .unwrap();

    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.truncated_batches, 1);
    assert_eq!(report.embedded, 2);
}

#[tokio::test]
async fn still_too_long_after_truncation_skips_the_batch() {
    let store = methods_store(2);
    let provider = Arc::new(LengthLimited {
        max_chars: 4,
        calls: AtomicUsize::new(0),
        inner: LocalEmbeddingProvider::new(8),
    });
    let report = EmbeddingJob::new(store.clone(), provider, &job_config(30, 2))
        .run()
        .await
        .unwrap();

    assert_eq!(report.skipped_batches, 1);
    assert_eq!(embedded_count(&store), 0);
}

/// Drops the last vector of any multi-text batch.
struct ShortCount;

#[async_trait::async_trait]
impl EmbeddingProvider for ShortCount {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError> {
        let count = if texts.len() > 1 { texts.len() - 1 } else { texts.len() };
        Ok(vec![vec![1.0; 4]; count])
    }

    fn dimensions(&self) -> usize {
        4
    }

    fn name(&self) -> &'static str {
        "short"
    }
}

#[tokio::test]
async fn count_mismatch_skips_the_batch() {
    let store = methods_store(3);
    let report = EmbeddingJob::new(store.clone(), Arc::new(ShortCount), &job_config(2, 256))
        .run()
        .await
        .unwrap();

    assert_eq!(report.methods, 3);
    assert_eq!(report.skipped_batches, 1);
    assert_eq!(report.embedded, 1);
    assert_eq!(embedded_count(&store), 1);
}

#[tokio::test]
async fn spawned_job_reports_through_callback() {
    let store = methods_store(2);
    let job = EmbeddingJob::new(store.clone(), Arc::new(LocalEmbeddingProvider::new(8)), &job_config(30, 256));
    let (tx, rx) = tokio::sync::oneshot::channel();
    crate::spawn_embedding_job(job, move |report| {
        let _ = tx.send(report.embedded);
    })
    .await
    .unwrap();
    assert_eq!(rx.await.unwrap(), 2);
}
