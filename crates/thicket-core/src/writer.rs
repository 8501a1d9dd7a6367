//! GraphWriter: one upsert per node and relationship kind of the schema
//!
//! Every operation is fire-and-log: a failed write is reported through
//! `tracing` and counted, never propagated, so one lost write cannot abort an
//! extraction pass.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

use crate::error::StoreResult;
use crate::model::{EdgeKind, NodeKey, Properties, PropertyValue};
use crate::store::GraphStore;

/// Source-level detail written onto a Method node when its declaration is extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDetail {
    pub simple_name: String,
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub code: String,
}

/// Attributes of a Field node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDetail {
    pub name: String,
    pub type_name: String,
    pub initial_value: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteStats {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct GraphWriter {
    store: Arc<dyn GraphStore>,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl std::fmt::Debug for GraphWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphWriter").field("stats", &self.stats()).finish()
    }
}

fn props<const N: usize>(entries: [(&str, PropertyValue); N]) -> Properties {
    entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

impl GraphWriter {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    pub fn stats(&self) -> WriteStats {
        WriteStats {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    fn record<T>(&self, what: &str, result: StoreResult<T>) -> bool {
        match result {
            Ok(_) => {
                self.succeeded.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(err) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Graph write failed ({what}): {err}");
                false
            }
        }
    }

    fn node(&self, key: NodeKey, properties: Properties) -> bool {
        let what = key.to_string();
        self.record(&what, self.store.merge_node(&key, properties))
    }

    fn edge(&self, from: &NodeKey, to: &NodeKey, kind: EdgeKind) -> bool {
        let what = format!("{from} -[{kind}]-> {to}");
        self.record(&what, self.store.merge_edge(from, to, kind))
    }

    // ── Filesystem ──────────────────────────────────────────

    pub fn insert_directory(&self, path: &str) -> bool {
        self.node(NodeKey::directory(path), Properties::new())
    }

    pub fn directory_to_directory(&self, parent: &str, child: &str) -> bool {
        self.insert_directory(parent)
            && self.insert_directory(child)
            && self.edge(&NodeKey::directory(parent), &NodeKey::directory(child), EdgeKind::HasDir)
    }

    pub fn insert_file(&self, path: &str) -> bool {
        self.node(NodeKey::file(path), props([("type", "java".into())]))
    }

    pub fn directory_to_file(&self, directory: &str, file: &str) -> bool {
        self.insert_directory(directory)
            && self.insert_file(file)
            && self.edge(&NodeKey::directory(directory), &NodeKey::file(file), EdgeKind::HasFile)
    }

    // ── Compilation unit ────────────────────────────────────

    pub fn file_to_package(&self, file: &str, package: &str) -> bool {
        self.node(NodeKey::package(package), Properties::new())
            && self.edge(&NodeKey::file(file), &NodeKey::package(package), EdgeKind::InPackage)
    }

    pub fn file_to_import(&self, file: &str, import: &str) -> bool {
        self.node(NodeKey::import(import), Properties::new())
            && self.edge(&NodeKey::file(file), &NodeKey::import(import), EdgeKind::HasImport)
    }

    // ── Classes ─────────────────────────────────────────────

    /// Upsert a class declared in source, recording its declaration kind.
    pub fn insert_class(&self, qualified_name: &str, kind: &str) -> bool {
        self.node(NodeKey::class(qualified_name), props([("kind", kind.into())]))
    }

    /// Upsert a class known only by reference. Converges with the declared node later.
    pub fn insert_class_stub(&self, qualified_name: &str) -> bool {
        self.node(NodeKey::class(qualified_name), Properties::new())
    }

    pub fn file_to_class(&self, file: &str, class: &str) -> bool {
        self.edge(&NodeKey::file(file), &NodeKey::class(class), EdgeKind::HasClass)
    }

    /// Nested class membership, `outer -[HAS_CLASS]-> inner`.
    pub fn class_to_class(&self, outer: &str, inner: &str) -> bool {
        self.edge(&NodeKey::class(outer), &NodeKey::class(inner), EdgeKind::HasClass)
    }

    pub fn class_extends(&self, class: &str, parent: &str) -> bool {
        self.insert_class_stub(parent) && self.edge(&NodeKey::class(class), &NodeKey::class(parent), EdgeKind::Extends)
    }

    pub fn class_implements(&self, class: &str, interface: &str) -> bool {
        self.insert_class_stub(interface)
            && self.edge(&NodeKey::class(class), &NodeKey::class(interface), EdgeKind::Implements)
    }

    // ── Methods ─────────────────────────────────────────────

    /// Upsert a declared method and overwrite its source detail.
    pub fn insert_method(&self, signature: &str, detail: &MethodDetail) -> bool {
        self.node(
            NodeKey::method(signature),
            props([
                ("simple_name", detail.simple_name.as_str().into()),
                ("file", detail.file.as_str().into()),
                ("start_line", detail.start_line.into()),
                ("end_line", detail.end_line.into()),
                ("code", detail.code.as_str().into()),
            ]),
        )
    }

    /// Upsert a method known only as a call target.
    pub fn insert_method_stub(&self, signature: &str) -> bool {
        self.node(NodeKey::method(signature), Properties::new())
    }

    pub fn class_to_method(&self, class: &str, signature: &str) -> bool {
        self.edge(&NodeKey::class(class), &NodeKey::method(signature), EdgeKind::HasMethod)
    }

    pub fn class_to_constructor(&self, class: &str, signature: &str) -> bool {
        self.edge(&NodeKey::class(class), &NodeKey::method(signature), EdgeKind::HasConstructor)
    }

    // ── Fields ──────────────────────────────────────────────

    /// Attach an attributed field to its owner.
    pub fn class_to_field(&self, class: &str, field: &FieldDetail) -> bool {
        let key = NodeKey::field(class, &field.name);
        self.node(
            key.clone(),
            props([
                ("name", field.name.as_str().into()),
                ("type", field.type_name.as_str().into()),
                ("initialValue", field.initial_value.as_str().into()),
            ]),
        ) && self.edge(&NodeKey::class(class), &key, EdgeKind::HasField)
    }

    /// Attach a field and link it to the project class that types it.
    pub fn class_to_field_to_class(&self, class: &str, field: &FieldDetail, field_class: &str) -> bool {
        self.class_to_field(class, field)
            && self.insert_class_stub(field_class)
            && self.edge(
                &NodeKey::field(class, &field.name),
                &NodeKey::class(field_class),
                EdgeKind::HasType,
            )
    }

    // ── Method bodies ───────────────────────────────────────

    pub fn method_calls_method(&self, caller: &str, callee: &str) -> bool {
        self.insert_method_stub(callee)
            && self.edge(&NodeKey::method(caller), &NodeKey::method(callee), EdgeKind::CallsMethod)
    }

    pub fn method_uses_class(&self, method: &str, class: &str) -> bool {
        self.insert_class_stub(class) && self.edge(&NodeKey::method(method), &NodeKey::class(class), EdgeKind::UsesClass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryGraphStore;

    fn writer() -> (Arc<MemoryGraphStore>, GraphWriter) {
        let store = Arc::new(MemoryGraphStore::new());
        (store.clone(), GraphWriter::new(store))
    }

    #[test]
    fn stub_and_declared_class_converge() {
        let (store, writer) = writer();
        assert!(writer.insert_class("app.Child", "class"));
        assert!(writer.class_extends("app.Child", "app.Base"));
        assert!(writer.insert_class("app.Base", "class"));

        let base = store.find(&NodeKey::class("app.Base")).unwrap().unwrap();
        let detail = store.hydrate_nodes(&[base]).unwrap();
        assert_eq!(detail[0].properties["kind"], "class");
        assert_eq!(store.counts().unwrap().nodes, 2);
        assert_eq!(store.counts().unwrap().relationships, 1);
    }

    #[test]
    fn method_stub_keeps_detail_written_by_declaration() {
        let (store, writer) = writer();
        let detail = MethodDetail {
            simple_name: "run()".into(),
            file: "/src/A.java".into(),
            start_line: 3,
            end_line: 5,
            code: "run() {}".into(),
        };
        writer.insert_method("app.A.run()", &detail);
        writer.method_calls_method("app.A.run()", "app.A.run()");

        let id = store.find(&NodeKey::method("app.A.run()")).unwrap().unwrap();
        let node = &store.hydrate_nodes(&[id]).unwrap()[0];
        assert_eq!(node.properties["start_line"], 3);
        assert_eq!(store.counts().unwrap().relationships, 1);
    }

    #[test]
    fn failed_writes_are_counted_not_raised() {
        let (store, writer) = writer();
        assert!(!writer.class_to_method("app.Missing", "app.Missing.x()"));
        store.disconnect();
        assert!(!writer.insert_directory("/src"));
        assert_eq!(writer.stats(), WriteStats { succeeded: 0, failed: 2 });
    }

    #[test]
    fn fields_are_keyed_per_owner() {
        let (store, writer) = writer();
        let field = FieldDetail {
            name: "config".into(),
            type_name: "Config".into(),
            initial_value: String::new(),
        };
        writer.insert_class("app.A", "class");
        writer.insert_class("app.B", "class");
        writer.class_to_field_to_class("app.A", &field, "app.Config");
        writer.class_to_field_to_class("app.B", &field, "app.Config");
        writer.class_to_field_to_class("app.B", &field, "app.Config");

        // A, B, Config, A.config, B.config
        assert_eq!(store.counts().unwrap().nodes, 5);
        assert_eq!(store.counts().unwrap().relationships, 4);
    }
}
