//! Fixtures for indexing scenarios: throwaway Java projects and a keyed view of the graph

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use thicket_core::{EdgeKind, GraphStore, IndexerConfig, MemoryGraphStore, NodeLabel, Properties, PropertyValue};

use crate::coordinator::{Coordinator, IndexReport};
use crate::parser_pool::ParserPool;

/// A Java source tree in a temporary directory.
pub struct JavaProject {
    dir: tempfile::TempDir,
}

impl JavaProject {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Canonical root, as the coordinator records it.
    pub fn root(&self) -> PathBuf {
        self.dir.path().canonicalize().unwrap()
    }

    pub fn path(&self, relative: &str) -> String {
        self.root().join(relative).display().to_string()
    }

    pub fn write(&self, relative: &str, source: &str) -> &Self {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, source).unwrap();
        self
    }

    pub fn remove(&self, relative: &str) -> &Self {
        fs::remove_file(self.dir.path().join(relative)).unwrap();
        self
    }

    pub fn index_into(&self, store: &Arc<MemoryGraphStore>) -> IndexReport {
        let coordinator = Coordinator::with_pool(store.clone(), IndexerConfig::default(), ParserPool::new(2));
        coordinator.index_project(self.dir.path()).unwrap()
    }

    pub fn index(&self) -> (Arc<MemoryGraphStore>, IndexReport) {
        let store = Arc::new(MemoryGraphStore::new());
        let report = self.index_into(&store);
        (store, report)
    }
}

/// The whole graph with every node addressed by label and natural key.
pub struct GraphView {
    nodes: HashMap<(NodeLabel, String), Properties>,
    edges: Vec<(EdgeKind, String, String)>,
}

impl GraphView {
    pub fn of(store: &dyn GraphStore) -> Self {
        let mut keys = HashMap::new();
        let mut nodes = HashMap::new();
        for label in NodeLabel::ALL {
            for node in store.scan(label, label.key_property(), 0, usize::MAX).unwrap() {
                let key = node.properties[label.key_property()].as_str().unwrap().to_string();
                keys.insert(node.id, key.clone());
                nodes.insert((label, key), node.properties);
            }
        }
        let ids: Vec<_> = keys.keys().copied().collect();
        let edge_ids = store.induced_relationships(&ids).unwrap();
        let mut edges: Vec<_> = store
            .hydrate_relationships(&edge_ids)
            .unwrap()
            .into_iter()
            .map(|r| (r.kind, keys[&r.start].clone(), keys[&r.end].clone()))
            .collect();
        edges.sort();
        Self { nodes, edges }
    }

    pub fn has_node(&self, label: NodeLabel, key: &str) -> bool {
        self.nodes.contains_key(&(label, key.to_string()))
    }

    pub fn property(&self, label: NodeLabel, key: &str, name: &str) -> Option<&PropertyValue> {
        self.nodes.get(&(label, key.to_string()))?.get(name)
    }

    pub fn count(&self, label: NodeLabel) -> usize {
        self.nodes.keys().filter(|(l, _)| *l == label).count()
    }

    pub fn has_edge(&self, kind: EdgeKind, from: &str, to: &str) -> bool {
        self.edges.iter().any(|(k, f, t)| *k == kind && f == from && t == to)
    }

    /// `(from, to)` natural keys of every relationship of a kind, sorted.
    pub fn edges(&self, kind: EdgeKind) -> Vec<(&str, &str)> {
        self.edges
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, f, t)| (f.as_str(), t.as_str()))
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
