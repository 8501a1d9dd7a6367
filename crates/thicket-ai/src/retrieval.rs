//! Hybrid retrieval: vector search for seeds, graph expansion, hydration
//!
//! A query runs in stages, any of which may cut the result short:
//!
//! 0. the store must answer a probe and an embedding provider must be configured;
//! 1. the query text is embedded with the ingestion provider;
//! 2. the nearest `Method` nodes in the vector index become seeds;
//! 3. each seed is expanded through the pattern stack into a cluster of ids;
//! 4. each cluster is hydrated into labels, properties and relationships.
//!
//! [`RetrievalEngine::query`] never fails: problems are logged and turn into an
//! empty result, or into a missing cluster when only one seed is affected.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use thicket_core::{
    EdgeId, GraphStore, NodeDetail, NodeId, RelationshipDetail, RelationshipPolicy, RetrievalConfig, ScoredNode,
};

use crate::bridge::EmbeddingProvider;
use crate::error::{AiError, RetrievalError};
use crate::patterns::{TraversalPattern, default_patterns};

/// Properties never shown in hydrated output.
pub const HIDDEN_PROPERTIES: [&str; 3] = ["embedding", "start_line", "end_line"];

/// Ids gathered for one seed, deduplicated in encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cluster {
    pub seed: NodeId,
    pub nodes: Vec<NodeId>,
    pub relationships: Vec<EdgeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdRef {
    pub id: String,
}

/// Id-only view of a cluster, for graph rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterIds {
    pub nodes: Vec<IdRef>,
    pub rels: Vec<IdRef>,
}

impl From<&Cluster> for ClusterIds {
    fn from(cluster: &Cluster) -> Self {
        Self {
            nodes: cluster.nodes.iter().map(|id| IdRef { id: id.to_string() }).collect(),
            rels: cluster
                .relationships
                .iter()
                .map(|id| IdRef { id: id.to_string() })
                .collect(),
        }
    }
}

/// Hydrated view of a cluster, for LLM context.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterDetail {
    pub nodes: Vec<NodeDetail>,
    pub relationships: Vec<RelationshipDetail>,
}

/// One entry per surviving seed in each view, in seed order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub graph: Vec<ClusterIds>,
    pub chat: Vec<ClusterDetail>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty() && self.chat.is_empty()
    }
}

pub struct RetrievalEngine {
    store: Arc<dyn GraphStore>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    config: RetrievalConfig,
    patterns: Vec<TraversalPattern>,
}

impl RetrievalEngine {
    pub fn new(
        store: Arc<dyn GraphStore>,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
            patterns: default_patterns(),
        }
    }

    pub fn with_patterns(mut self, patterns: Vec<TraversalPattern>) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Run a query, degrading every failure to an empty result.
    pub async fn query(&self, text: &str, top_n: usize) -> QueryResult {
        match self.try_query(text, top_n).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!("Query returned no results: {err}");
                QueryResult::default()
            }
        }
    }

    /// Run a query, reporting why it produced nothing. Failures confined to one
    /// seed still only drop that seed's cluster.
    pub async fn try_query(&self, text: &str, top_n: usize) -> Result<QueryResult, RetrievalError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RetrievalError::MalformedInput("query text is empty".to_string()));
        }
        self.store.probe()?;
        let embedder = self
            .embedder
            .as_ref()
            .ok_or_else(|| RetrievalError::NotConfigured("embedding provider".to_string()))?;
        if top_n == 0 {
            return Ok(QueryResult::default());
        }

        let vector = embedder.embed(text).await?;
        if vector.is_empty() {
            return Err(AiError::EmptyEmbedding(embedder.name()).into());
        }

        let seeds = self.seeds(&vector, top_n)?;
        tracing::debug!("Query matched {} seeds", seeds.len());

        let mut result = QueryResult::default();
        for seed in seeds {
            match self.expand(seed.id).and_then(|cluster| Ok((self.hydrate(&cluster)?, cluster))) {
                Ok((detail, cluster)) => {
                    result.graph.push(ClusterIds::from(&cluster));
                    result.chat.push(detail);
                }
                Err(err) => tracing::warn!(seed = %seed.id, "Dropping cluster: {err}"),
            }
        }
        Ok(result)
    }

    /// Nearest `Method` nodes to a query vector, by descending similarity.
    pub fn seeds(&self, vector: &[f32], top_n: usize) -> Result<Vec<ScoredNode>, RetrievalError> {
        Ok(self.store.nearest(&self.config.index_name, vector, top_n)?)
    }

    /// Union every pattern's traversal from `seed`.
    pub fn expand(&self, seed: NodeId) -> Result<Cluster, RetrievalError> {
        let mut cluster = Cluster {
            seed,
            ..Cluster::default()
        };
        let mut seen_nodes = HashSet::new();
        let mut seen_relationships = HashSet::new();
        for pattern in &self.patterns {
            let traversal = self.store.traverse(seed, &pattern.spec)?;
            tracing::trace!(
                seed = %seed,
                pattern = pattern.name,
                "{} nodes, {} relationships",
                traversal.nodes.len(),
                traversal.relationships.len()
            );
            cluster
                .nodes
                .extend(traversal.nodes.into_iter().filter(|id| seen_nodes.insert(*id)));
            cluster.relationships.extend(
                traversal
                    .relationships
                    .into_iter()
                    .filter(|id| seen_relationships.insert(*id)),
            );
        }
        match self.config.relationships {
            RelationshipPolicy::Omitted => cluster.relationships.clear(),
            RelationshipPolicy::Traversed => {}
            RelationshipPolicy::Induced => cluster.relationships = self.store.induced_relationships(&cluster.nodes)?,
        }
        Ok(cluster)
    }

    /// Fetch full detail for exactly the cluster's ids, minus hidden properties.
    pub fn hydrate(&self, cluster: &Cluster) -> Result<ClusterDetail, RetrievalError> {
        let mut nodes = self.store.hydrate_nodes(&cluster.nodes)?;
        if nodes.len() != cluster.nodes.len() {
            return Err(RetrievalError::Store(thicket_core::StoreError::UnknownNode(
                missing(&cluster.nodes, &nodes).unwrap_or(cluster.seed),
            )));
        }
        for node in &mut nodes {
            for hidden in HIDDEN_PROPERTIES {
                node.properties.remove(hidden);
            }
        }
        let relationships = self.store.hydrate_relationships(&cluster.relationships)?;
        Ok(ClusterDetail { nodes, relationships })
    }
}

fn missing(expected: &[NodeId], found: &[NodeDetail]) -> Option<NodeId> {
    let found: HashSet<NodeId> = found.iter().map(|n| n.id).collect();
    expected.iter().copied().find(|id| !found.contains(id))
}
