//! Store error taxonomy

use crate::model::{EdgeId, NodeId, NodeKey};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("graph store is unavailable")]
    Unavailable,

    #[error("relationship endpoint {0} does not exist")]
    MissingEndpoint(NodeKey),

    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("relationship {0} does not exist")]
    UnknownRelationship(EdgeId),

    #[error("vector index `{0}` does not exist")]
    UnknownIndex(String),

    #[error("vector has {actual} dimensions but index `{index}` expects {expected}")]
    DimensionMismatch {
        index: String,
        expected: usize,
        actual: usize,
    },

    #[error("graph store lock poisoned")]
    Poisoned,

    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot is corrupt: {0}")]
    Snapshot(#[from] bincode::Error),
}

impl StoreError {
    /// Whether this failure reflects an unreachable store rather than bad input.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable | StoreError::Poisoned)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
