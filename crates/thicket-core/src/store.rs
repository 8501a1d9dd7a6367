//! GraphStore: mutation and query facade over a property graph with vector indexes

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{StoreError, StoreResult};
use crate::graph::PropertyGraph;
use crate::model::*;
use crate::query::*;
use crate::snapshot;

/// Everything the extractor writes and the retrieval engine reads.
///
/// Writes are match-or-create on natural keys, so repeating any write leaves
/// the graph unchanged. Reads never mutate.
pub trait GraphStore: Send + Sync {
    /// Connectivity probe.
    fn probe(&self) -> StoreResult<()>;

    /// Match-or-create a node on its natural key, then overwrite `properties`.
    fn merge_node(&self, key: &NodeKey, properties: Properties) -> StoreResult<NodeId>;

    /// Match-or-create a relationship between two existing nodes.
    fn merge_edge(&self, from: &NodeKey, to: &NodeKey, kind: EdgeKind) -> StoreResult<EdgeId>;

    /// Overwrite one attribute of an existing node.
    fn set_property(&self, id: NodeId, name: &str, value: PropertyValue) -> StoreResult<()>;

    fn find(&self, key: &NodeKey) -> StoreResult<Option<NodeId>>;

    fn counts(&self) -> StoreResult<GraphCounts>;

    /// Remove every node, relationship and index. Irreversible.
    fn wipe(&self) -> StoreResult<()>;

    /// Create a vector index, replacing any index of the same name.
    fn create_vector_index(&self, def: VectorIndexDef) -> StoreResult<()>;

    fn drop_vector_index(&self, name: &str) -> StoreResult<bool>;

    /// Page through nodes of a label that carry `required` as a non-null attribute.
    fn scan(&self, label: NodeLabel, required: &str, skip: usize, limit: usize) -> StoreResult<Vec<ScannedNode>>;

    /// Nearest neighbours of `vector` in the named index, by descending similarity.
    fn nearest(&self, index: &str, vector: &[f32], limit: usize) -> StoreResult<Vec<ScoredNode>>;

    /// Bounded traversal from `start`.
    fn traverse(&self, start: NodeId, spec: &TraversalSpec) -> StoreResult<Traversal>;

    /// Fetch nodes by id, in the given order. Unknown ids are skipped.
    fn hydrate_nodes(&self, ids: &[NodeId]) -> StoreResult<Vec<NodeDetail>>;

    /// Fetch relationships by id, in the given order. Unknown ids are skipped.
    fn hydrate_relationships(&self, ids: &[EdgeId]) -> StoreResult<Vec<RelationshipDetail>>;

    /// Relationships whose endpoints both lie within `ids`.
    fn induced_relationships(&self, ids: &[NodeId]) -> StoreResult<Vec<EdgeId>>;
}

#[derive(Debug, Default)]
pub(crate) struct StoreState {
    pub(crate) graph: PropertyGraph,
    pub(crate) indexes: HashMap<String, VectorIndexDef>,
}

/// In-process graph store.
///
/// Concurrency control is a single reader/writer lock; a disconnected store
/// rejects every operation with [`StoreError::Unavailable`].
#[derive(Debug)]
pub struct MemoryGraphStore {
    state: RwLock<StoreState>,
    connected: AtomicBool,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::from_state(StoreState::default())
    }

    pub(crate) fn from_state(state: StoreState) -> Self {
        Self {
            state: RwLock::new(state),
            connected: AtomicBool::new(true),
        }
    }

    /// Load a store from a snapshot file, or start empty if none exists.
    pub fn open(path: &Path) -> StoreResult<Self> {
        match snapshot::read(path)? {
            Some(state) => {
                tracing::info!(
                    nodes = state.graph.node_count(),
                    relationships = state.graph.edge_count(),
                    "Loaded graph snapshot from {}",
                    path.display()
                );
                Ok(Self::from_state(state))
            }
            None => Ok(Self::new()),
        }
    }

    /// Persist the current graph to a snapshot file.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let state = self.read()?;
        snapshot::write(&state, path)
    }

    pub fn connect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.probe()?;
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.probe()?;
        self.state.write().map_err(|_| StoreError::Poisoned)
    }
}

impl Default for MemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

impl GraphStore for MemoryGraphStore {
    fn probe(&self) -> StoreResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }

    fn merge_node(&self, key: &NodeKey, properties: Properties) -> StoreResult<NodeId> {
        let mut state = self.write()?;
        let (id, created) = state.graph.merge_node(key, properties);
        if created {
            tracing::trace!("Created node {key}");
        }
        Ok(id)
    }

    fn merge_edge(&self, from: &NodeKey, to: &NodeKey, kind: EdgeKind) -> StoreResult<EdgeId> {
        let mut state = self.write()?;
        let start = state.graph.find(from).ok_or_else(|| StoreError::MissingEndpoint(from.clone()))?;
        let end = state.graph.find(to).ok_or_else(|| StoreError::MissingEndpoint(to.clone()))?;
        state
            .graph
            .merge_edge(start, end, kind)
            .map(|(id, _)| id)
            .ok_or(StoreError::UnknownNode(start))
    }

    fn set_property(&self, id: NodeId, name: &str, value: PropertyValue) -> StoreResult<()> {
        let mut state = self.write()?;
        let node = state.graph.node_mut(id).ok_or(StoreError::UnknownNode(id))?;
        node.properties.insert(name.to_string(), value);
        Ok(())
    }

    fn find(&self, key: &NodeKey) -> StoreResult<Option<NodeId>> {
        Ok(self.read()?.graph.find(key))
    }

    fn counts(&self) -> StoreResult<GraphCounts> {
        let state = self.read()?;
        Ok(GraphCounts {
            nodes: state.graph.node_count(),
            relationships: state.graph.edge_count(),
        })
    }

    fn wipe(&self) -> StoreResult<()> {
        let mut state = self.write()?;
        state.graph.clear();
        state.indexes.clear();
        tracing::info!("Graph wiped");
        Ok(())
    }

    fn create_vector_index(&self, def: VectorIndexDef) -> StoreResult<()> {
        let mut state = self.write()?;
        tracing::debug!(
            "Creating vector index {} on {}.{} ({} dims)",
            def.name,
            def.label,
            def.property,
            def.dimensions
        );
        state.indexes.insert(def.name.clone(), def);
        Ok(())
    }

    fn drop_vector_index(&self, name: &str) -> StoreResult<bool> {
        Ok(self.write()?.indexes.remove(name).is_some())
    }

    fn scan(&self, label: NodeLabel, required: &str, skip: usize, limit: usize) -> StoreResult<Vec<ScannedNode>> {
        let state = self.read()?;
        Ok(state
            .graph
            .nodes()
            .filter(|(_, n)| n.label == label)
            .filter(|(_, n)| n.property(required).is_some_and(|v| *v != PropertyValue::Null))
            .skip(skip)
            .take(limit)
            .map(|(id, n)| ScannedNode {
                id,
                properties: n.properties.clone(),
            })
            .collect())
    }

    fn nearest(&self, index: &str, vector: &[f32], limit: usize) -> StoreResult<Vec<ScoredNode>> {
        let state = self.read()?;
        let def = state
            .indexes
            .get(index)
            .ok_or_else(|| StoreError::UnknownIndex(index.to_string()))?;
        if vector.len() != def.dimensions {
            return Err(StoreError::DimensionMismatch {
                index: def.name.clone(),
                expected: def.dimensions,
                actual: vector.len(),
            });
        }

        let mut hits: Vec<ScoredNode> = state
            .graph
            .nodes()
            .filter(|(_, n)| n.label == def.label)
            .filter_map(|(id, n)| {
                let stored = n.property(&def.property)?.as_vector()?;
                (stored.len() == def.dimensions).then(|| ScoredNode {
                    id,
                    score: cosine(vector, stored),
                })
            })
            .collect();
        // Stable sort: equal scores keep id order.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    fn traverse(&self, start: NodeId, spec: &TraversalSpec) -> StoreResult<Traversal> {
        self.read()?.graph.traverse(start, spec).ok_or(StoreError::UnknownNode(start))
    }

    fn hydrate_nodes(&self, ids: &[NodeId]) -> StoreResult<Vec<NodeDetail>> {
        let state = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|&id| {
                let node = state.graph.node(id)?;
                Some(NodeDetail {
                    id,
                    labels: vec![node.label.as_str().to_string()],
                    properties: node.properties.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
                })
            })
            .collect())
    }

    fn hydrate_relationships(&self, ids: &[EdgeId]) -> StoreResult<Vec<RelationshipDetail>> {
        let state = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|&id| {
                let (start, end, record) = state.graph.edge(id)?;
                Some(RelationshipDetail {
                    id,
                    kind: record.kind,
                    start,
                    end,
                    properties: record.properties.clone(),
                })
            })
            .collect())
    }

    fn induced_relationships(&self, ids: &[NodeId]) -> StoreResult<Vec<EdgeId>> {
        let set: HashSet<NodeId> = ids.iter().copied().collect();
        Ok(self.read()?.graph.induced_edges(&set))
    }
}
