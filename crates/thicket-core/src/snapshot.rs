//! On-disk graph snapshots under .thicket/

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::graph::PropertyGraph;
use crate::model::{EdgeKind, NodeId, NodeKey, NodeRecord, Properties};
use crate::query::VectorIndexDef;
use crate::store::StoreState;

/// Data directory: .thicket/
pub const DATA_DIR: &str = ".thicket";

/// Graph snapshot file
pub const GRAPH_SNAPSHOT: &str = "graph.bin";

/// Get data directory path
pub fn data_dir(root: &Path) -> PathBuf {
    root.join(DATA_DIR)
}

/// Get graph snapshot file path
pub fn snapshot_path(root: &Path) -> PathBuf {
    root.join(DATA_DIR).join(GRAPH_SNAPSHOT)
}

/// Relationships refer to nodes by position in `nodes`; surrogate ids are reassigned on load.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: String,
    saved_at: String,
    nodes: Vec<NodeRecord>,
    edges: Vec<SnapshotEdge>,
    indexes: Vec<VectorIndexDef>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotEdge {
    start: usize,
    end: usize,
    kind: EdgeKind,
    properties: Properties,
}

pub(crate) fn write(state: &StoreState, path: &Path) -> StoreResult<()> {
    let mut positions = std::collections::HashMap::<NodeId, usize>::new();
    let mut nodes = Vec::with_capacity(state.graph.node_count());
    for (id, record) in state.graph.nodes() {
        positions.insert(id, nodes.len());
        nodes.push(record.clone());
    }
    let edges = state
        .graph
        .edges()
        .filter_map(|(_, a, b, record)| {
            Some(SnapshotEdge {
                start: *positions.get(&a)?,
                end: *positions.get(&b)?,
                kind: record.kind,
                properties: record.properties.clone(),
            })
        })
        .collect();

    let snapshot = Snapshot {
        version: env!("CARGO_PKG_VERSION").to_string(),
        saved_at: chrono::Utc::now().to_rfc3339(),
        nodes,
        edges,
        indexes: state.indexes.values().cloned().collect(),
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = bincode::serialize(&snapshot)?;
    std::fs::write(path, bytes)?;
    tracing::debug!("Graph snapshot saved: {}", path.display());
    Ok(())
}

pub(crate) fn read(path: &Path) -> StoreResult<Option<StoreState>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path)?;
    let snapshot: Snapshot = bincode::deserialize(&bytes)?;
    tracing::debug!(
        "Graph snapshot {} written at {} by version {}",
        path.display(),
        snapshot.saved_at,
        snapshot.version
    );

    let mut graph = PropertyGraph::new();
    let ids: Vec<NodeId> = snapshot
        .nodes
        .into_iter()
        .map(|record| {
            let key = NodeKey::new(record.label, record.key);
            graph.merge_node(&key, record.properties).0
        })
        .collect();
    for edge in snapshot.edges {
        let (Some(&start), Some(&end)) = (ids.get(edge.start), ids.get(edge.end)) else {
            tracing::warn!("Skipping snapshot relationship with dangling endpoint");
            continue;
        };
        if let Some(record) = graph
            .merge_edge(start, end, edge.kind)
            .and_then(|(id, _)| graph.edge_mut(id))
        {
            record.properties = edge.properties;
        }
    }

    Ok(Some(StoreState {
        graph,
        indexes: snapshot.indexes.into_iter().map(|def| (def.name.clone(), def)).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropertyValue;
    use crate::store::{GraphStore, MemoryGraphStore};

    #[test]
    fn snapshot_round_trips_graph_and_indexes() {
        let dir = tempfile::tempdir().unwrap();
        let path = snapshot_path(dir.path());

        let store = MemoryGraphStore::new();
        let mut props = Properties::new();
        props.insert("start_line".into(), PropertyValue::Int(3));
        store.merge_node(&NodeKey::class("A"), Properties::new()).unwrap();
        store.merge_node(&NodeKey::method("A.run()"), props).unwrap();
        store
            .merge_edge(&NodeKey::class("A"), &NodeKey::method("A.run()"), EdgeKind::HasMethod)
            .unwrap();
        store
            .create_vector_index(VectorIndexDef::new("methodEmbeddings", crate::model::NodeLabel::Method, "embedding", 4))
            .unwrap();
        store.save(&path).unwrap();

        let loaded = MemoryGraphStore::open(&path).unwrap();
        assert_eq!(loaded.counts().unwrap(), store.counts().unwrap());
        let id = loaded.find(&NodeKey::method("A.run()")).unwrap().unwrap();
        let detail = loaded.hydrate_nodes(&[id]).unwrap();
        assert_eq!(detail[0].properties["start_line"], serde_json::json!(3));
        assert!(matches!(
            loaded.nearest("methodEmbeddings", &[0.0; 4], 1),
            Ok(hits) if hits.is_empty()
        ));
    }

    #[test]
    fn missing_snapshot_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryGraphStore::open(&snapshot_path(dir.path())).unwrap();
        assert!(store.counts().unwrap().is_empty());
    }
}
