//! Read-side types shared by the store and its consumers

use serde::{Deserialize, Serialize};

use crate::model::{EdgeId, EdgeKind, NodeId, NodeLabel, Properties};

/// A named nearest-neighbour index over one vector property of one label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorIndexDef {
    pub name: String,
    pub label: NodeLabel,
    pub property: String,
    pub dimensions: usize,
}

impl VectorIndexDef {
    pub fn new(name: impl Into<String>, label: NodeLabel, property: impl Into<String>, dimensions: usize) -> Self {
        Self {
            name: name.into(),
            label,
            property: property.into(),
            dimensions,
        }
    }
}

/// One nearest-neighbour hit. Scores are cosine similarities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredNode {
    pub id: NodeId,
    pub score: f32,
}

/// Parameters of one bounded, direction-agnostic breadth-first traversal.
///
/// A node qualifies when its hop distance from the start lies within
/// `min_hops..=max_hops`, its label passes `label_filter`, and the cap has not
/// been reached. Qualifying nodes are returned in encounter order, so a cap keeps
/// the nearest nodes first and breaks ties by traversal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalSpec {
    pub min_hops: usize,
    pub max_hops: usize,
    /// `None` walks every relationship kind.
    pub edge_filter: Option<Vec<EdgeKind>>,
    pub label_filter: Option<NodeLabel>,
    pub cap: Option<usize>,
    /// Also report the relationship through which each qualifying node was first reached.
    pub collect_relationships: bool,
}

impl TraversalSpec {
    pub fn within(max_hops: usize) -> Self {
        Self {
            min_hops: 1,
            max_hops,
            edge_filter: None,
            label_filter: None,
            cap: None,
            collect_relationships: false,
        }
    }

    pub fn allows_edge(&self, kind: EdgeKind) -> bool {
        self.edge_filter.as_ref().is_none_or(|kinds| kinds.contains(&kind))
    }
}

/// Result of a traversal: distinct node ids in encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Traversal {
    pub nodes: Vec<NodeId>,
    pub relationships: Vec<EdgeId>,
}

/// A node as yielded by a paged label scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedNode {
    pub id: NodeId,
    pub properties: Properties,
}

/// Fully hydrated node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDetail {
    pub id: NodeId,
    pub labels: Vec<String>,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// Fully hydrated relationship. Properties are fetched but not rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipDetail {
    #[serde(skip)]
    pub id: EdgeId,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    pub start: NodeId,
    pub end: NodeId,
    #[serde(skip)]
    pub properties: Properties,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphCounts {
    pub nodes: usize,
    pub relationships: usize,
}

impl GraphCounts {
    pub fn is_empty(&self) -> bool {
        self.nodes == 0
    }
}
