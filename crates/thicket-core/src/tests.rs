//! Store-level scenarios spanning writer, traversal and hydration

use std::sync::Arc;

use crate::*;

/// Writes a small project: two classes, a call chain and a typed field.
fn populate(writer: &GraphWriter) {
    writer.directory_to_file("/p/src", "/p/src/Loader.java");
    writer.file_to_package("/p/src/Loader.java", "app");
    writer.file_to_import("/p/src/Loader.java", "java.util.List");
    writer.insert_class("app.Loader", "class");
    writer.file_to_class("/p/src/Loader.java", "app.Loader");
    writer.class_implements("app.Loader", "app.Source");

    let methods = [
        ("app.Loader.load()", "load()", 4),
        ("app.Loader.parse(java.lang.String)", "parse()", 9),
    ];
    for (signature, simple_name, line) in methods {
        let detail = MethodDetail {
            simple_name: simple_name.to_string(),
            file: "/p/src/Loader.java".into(),
            start_line: line,
            end_line: line + 3,
            code: format!("{signature} {{}}"),
        };
        writer.insert_method(signature, &detail);
        writer.class_to_method("app.Loader", signature);
    }
    writer.method_calls_method("app.Loader.load()", "app.Loader.parse(java.lang.String)");
    writer.method_uses_class("app.Loader.parse(java.lang.String)", "app.Config");
    writer.class_to_field_to_class(
        "app.Loader",
        &FieldDetail {
            name: "config".into(),
            type_name: "app.Config".into(),
            initial_value: String::new(),
        },
        "app.Config",
    );
}

#[test]
fn repeating_a_write_pass_is_idempotent() {
    let store = Arc::new(MemoryGraphStore::new());
    let writer = GraphWriter::new(store.clone());
    populate(&writer);
    let first = store.counts().unwrap();
    populate(&writer);
    assert_eq!(store.counts().unwrap(), first);
    assert_eq!(writer.stats().failed, 0);
}

#[test]
fn traversal_and_hydration_work_on_written_graph() {
    let store = Arc::new(MemoryGraphStore::new());
    populate(&GraphWriter::new(store.clone()));

    let load = store.find(&NodeKey::method("app.Loader.load()")).unwrap().unwrap();
    let spec = TraversalSpec {
        edge_filter: Some(vec![EdgeKind::CallsMethod]),
        ..TraversalSpec::within(3)
    };
    let reached = store.traverse(load, &spec).unwrap();
    let details = store.hydrate_nodes(&reached.nodes).unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].labels, vec!["Method"]);
    assert_eq!(details[0].properties["name"], "app.Loader.parse(java.lang.String)");

    let induced = store.induced_relationships(&[load, reached.nodes[0]]).unwrap();
    let rels = store.hydrate_relationships(&induced).unwrap();
    insta::assert_json_snapshot!(rels, @r###"
    [
      {
        "type": "CALLS_METHOD",
        "start": 6,
        "end": 7
      }
    ]
    "###);
}

#[test]
fn traversing_from_unknown_node_is_an_error() {
    let store = MemoryGraphStore::new();
    let err = store.traverse(NodeId(42), &TraversalSpec::within(1)).unwrap_err();
    assert!(matches!(err, StoreError::UnknownNode(NodeId(42))));
}
