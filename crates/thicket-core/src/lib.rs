//! Thicket Core: property graph schema, graph store and vector index

pub mod config;
pub mod error;
pub mod graph;
pub mod model;
pub mod query;
pub mod snapshot;
pub mod store;
pub mod writer;

#[cfg(test)]
mod tests;

pub use config::{
    EmbeddingsConfig, IndexerConfig, LlmConfig, RelationshipPolicy, RetrievalConfig, StoreConfig,
    ThicketConfig, CONFIG_FILE,
};
pub use error::{StoreError, StoreResult};
pub use graph::PropertyGraph;
pub use model::{EdgeId, EdgeKind, NodeId, NodeKey, NodeLabel, NodeRecord, Properties, PropertyValue};
pub use query::{
    GraphCounts, NodeDetail, RelationshipDetail, ScoredNode, ScannedNode, Traversal, TraversalSpec,
    VectorIndexDef,
};
pub use snapshot::{DATA_DIR, GRAPH_SNAPSHOT, data_dir, snapshot_path};
pub use store::{GraphStore, MemoryGraphStore};
pub use writer::{FieldDetail, GraphWriter, MethodDetail, WriteStats};
