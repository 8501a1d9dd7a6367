//! Property graph over petgraph::StableDiGraph with natural-key indexes

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;

use crate::model::*;
use crate::query::{Traversal, TraversalSpec};

/// A directed property graph where every node is unique on (label, key) and
/// every relationship is unique on (start, end, kind).
pub struct PropertyGraph {
    inner: StableDiGraph<NodeRecord, EdgeRecord>,
    keys: HashMap<(NodeLabel, String), NodeIndex>,
    edges: HashMap<(NodeIndex, NodeIndex, EdgeKind), EdgeIndex>,
}

impl std::fmt::Debug for PropertyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyGraph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

fn node_id(idx: NodeIndex) -> NodeId {
    NodeId(idx.index() as u64)
}

fn edge_id(idx: EdgeIndex) -> EdgeId {
    EdgeId(idx.index() as u64)
}

fn node_index(id: NodeId) -> NodeIndex {
    NodeIndex::new(id.0 as usize)
}

impl PropertyGraph {
    pub fn new() -> Self {
        PropertyGraph {
            inner: StableDiGraph::new(),
            keys: HashMap::new(),
            edges: HashMap::new(),
        }
    }

    /// Match-or-create a node on its natural key, then overwrite the given attributes.
    /// Attributes not mentioned are left untouched. Returns the id and whether it was created.
    pub fn merge_node(&mut self, key: &NodeKey, properties: Properties) -> (NodeId, bool) {
        let lookup = (key.label, key.key.clone());
        let (idx, created) = match self.keys.get(&lookup) {
            Some(&idx) => (idx, false),
            None => {
                let mut props = Properties::new();
                props.insert(key.label.key_property().to_string(), PropertyValue::from(key.key.as_str()));
                let idx = self.inner.add_node(NodeRecord {
                    label: key.label,
                    key: key.key.clone(),
                    properties: props,
                });
                self.keys.insert(lookup, idx);
                (idx, true)
            }
        };

        if let Some(record) = self.inner.node_weight_mut(idx) {
            let key_property = key.label.key_property();
            for (name, value) in properties {
                if name != key_property {
                    record.properties.insert(name, value);
                }
            }
        }
        (node_id(idx), created)
    }

    /// Match-or-create a relationship between two existing nodes.
    /// Returns `None` if either endpoint is missing.
    pub fn merge_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) -> Option<(EdgeId, bool)> {
        let (a, b) = (node_index(from), node_index(to));
        if !self.inner.contains_node(a) || !self.inner.contains_node(b) {
            return None;
        }
        if let Some(&idx) = self.edges.get(&(a, b, kind)) {
            return Some((edge_id(idx), false));
        }
        let idx = self.inner.add_edge(
            a,
            b,
            EdgeRecord {
                kind,
                properties: Properties::new(),
            },
        );
        self.edges.insert((a, b, kind), idx);
        Some((edge_id(idx), true))
    }

    /// Find a node by natural key.
    pub fn find(&self, key: &NodeKey) -> Option<NodeId> {
        self.keys.get(&(key.label, key.key.clone())).map(|&idx| node_id(idx))
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.inner.node_weight(node_index(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeRecord> {
        self.inner.node_weight_mut(node_index(id))
    }

    /// Get a relationship with its endpoints.
    pub fn edge(&self, id: EdgeId) -> Option<(NodeId, NodeId, &EdgeRecord)> {
        let idx = EdgeIndex::new(id.0 as usize);
        let (a, b) = self.inner.edge_endpoints(idx)?;
        let record = self.inner.edge_weight(idx)?;
        Some((node_id(a), node_id(b), record))
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut EdgeRecord> {
        self.inner.edge_weight_mut(EdgeIndex::new(id.0 as usize))
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Total number of relationships.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Iterate over all nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NodeRecord)> {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx).map(|n| (node_id(idx), n)))
    }

    /// Iterate over all relationships as (id, start, end, record).
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, NodeId, NodeId, &EdgeRecord)> {
        self.inner.edge_indices().filter_map(move |idx| {
            let (a, b) = self.inner.edge_endpoints(idx)?;
            let record = self.inner.edge_weight(idx)?;
            Some((edge_id(idx), node_id(a), node_id(b), record))
        })
    }

    /// Iterate over the ids of all nodes carrying a label, in id order.
    pub fn nodes_with_label(&self, label: NodeLabel) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes()
            .filter(move |(_, record)| record.label == label)
            .map(|(id, _)| id)
    }

    /// Relationships touching a node in either direction, ordered by relationship id.
    fn incident(&self, idx: NodeIndex) -> Vec<(EdgeIndex, NodeIndex, EdgeKind)> {
        let mut out: Vec<_> = self
            .inner
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.id(), e.target(), e.weight().kind))
            .chain(
                self.inner
                    .edges_directed(idx, Direction::Incoming)
                    .map(|e| (e.id(), e.source(), e.weight().kind)),
            )
            .collect();
        out.sort_by_key(|(edge, _, _)| edge.index());
        out
    }

    /// Bounded breadth-first traversal ignoring relationship direction.
    /// Returns `None` if the start node does not exist.
    pub fn traverse(&self, start: NodeId, spec: &TraversalSpec) -> Option<Traversal> {
        let start_idx = node_index(start);
        if !self.inner.contains_node(start_idx) {
            return None;
        }

        let mut result = Traversal::default();
        let mut seen: HashSet<NodeIndex> = HashSet::from([start_idx]);
        let mut queue: VecDeque<(NodeIndex, usize, Option<EdgeIndex>)> = VecDeque::from([(start_idx, 0, None)]);

        while let Some((idx, depth, via)) = queue.pop_front() {
            if spec.cap.is_some_and(|cap| result.nodes.len() >= cap) {
                break;
            }
            if depth >= spec.min_hops && self.qualifies(idx, spec) {
                result.nodes.push(node_id(idx));
                if spec.collect_relationships {
                    result.relationships.extend(via.map(edge_id));
                }
            }
            if depth == spec.max_hops {
                continue;
            }
            for (edge, neighbour, kind) in self.incident(idx) {
                if spec.allows_edge(kind) && seen.insert(neighbour) {
                    queue.push_back((neighbour, depth + 1, Some(edge)));
                }
            }
        }
        Some(result)
    }

    fn qualifies(&self, idx: NodeIndex, spec: &TraversalSpec) -> bool {
        match spec.label_filter {
            Some(label) => self.inner.node_weight(idx).is_some_and(|n| n.label == label),
            None => true,
        }
    }

    /// All relationships whose endpoints both lie in the given node set.
    pub fn induced_edges(&self, nodes: &HashSet<NodeId>) -> Vec<EdgeId> {
        self.edges()
            .filter(|(_, a, b, _)| nodes.contains(a) && nodes.contains(b))
            .map(|(id, _, _, _)| id)
            .collect()
    }

    /// Remove every node and relationship.
    pub fn clear(&mut self) {
        self.inner.clear();
        self.keys.clear();
        self.edges.clear();
    }
}

impl Default for PropertyGraph {
    fn default() -> Self {
        Self::new()
    }
}
