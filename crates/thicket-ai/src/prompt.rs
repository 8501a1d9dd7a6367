//! Prompt assembly from hydrated clusters

use std::collections::HashMap;
use std::fmt::Write;

use thicket_core::{NodeDetail, NodeId, NodeLabel};

use crate::bridge::ChatMessage;
use crate::budget::Budget;
use crate::retrieval::ClusterDetail;

const SYSTEM_PREAMBLE: &str = "You are a code assistant for a Java project. \
Answer using the code graph excerpts below. Each cluster starts from a method \
that matched the question and includes related methods, classes, fields and \
files. Say so when the excerpts do not contain the answer.";

/// The natural-key property of a hydrated node, used as its display name.
fn display_name(node: &NodeDetail) -> String {
    let key = node
        .labels
        .first()
        .and_then(|label| NodeLabel::parse(label))
        .map(|label| label.key_property())
        .unwrap_or("name");
    node.properties
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", node.id))
}

fn render_cluster(index: usize, cluster: &ClusterDetail) -> String {
    let names: HashMap<NodeId, String> = cluster.nodes.iter().map(|n| (n.id, display_name(n))).collect();
    let mut out = String::new();
    let _ = writeln!(out, "## Cluster {}", index + 1);
    for node in &cluster.nodes {
        let label = node.labels.join(":");
        let _ = writeln!(out, "- [{label}] {}", names[&node.id]);
        for (key, value) in &node.properties {
            if key == "code" || key == "name" || key == "path" || key == "qualified_name" {
                continue;
            }
            if let Some(text) = value.as_str().filter(|s| !s.is_empty()) {
                let _ = writeln!(out, "  {key}: {text}");
            }
        }
        if let Some(code) = node.properties.get("code").and_then(|v| v.as_str()) {
            let _ = writeln!(out, "```java\n{code}\n```");
        }
    }
    if !cluster.relationships.is_empty() {
        out.push_str("Relationships:\n");
        for rel in &cluster.relationships {
            let start = names.get(&rel.start).cloned().unwrap_or_else(|| format!("#{}", rel.start));
            let end = names.get(&rel.end).cloned().unwrap_or_else(|| format!("#{}", rel.end));
            let _ = writeln!(out, "- {start} -[{}]-> {end}", rel.kind);
        }
    }
    out
}

/// System context built from clusters in order until the token budget runs out.
pub fn digest_context(clusters: &[ClusterDetail], tokens_per_request: usize) -> String {
    let mut budget = Budget::new(tokens_per_request);
    let mut context = String::from(SYSTEM_PREAMBLE);
    budget.try_spend(&context);
    for (index, cluster) in clusters.iter().enumerate() {
        let rendered = render_cluster(index, cluster);
        if !budget.try_spend(&rendered) {
            tracing::debug!("Context budget exhausted after {index} clusters");
            break;
        }
        context.push_str("\n\n");
        context.push_str(&rendered);
    }
    context
}

/// Prepend the digest as a system message to a conversation.
pub fn with_context(clusters: &[ClusterDetail], tokens_per_request: usize, conversation: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(conversation.len() + 1);
    messages.push(ChatMessage::system(digest_context(clusters, tokens_per_request)));
    messages.extend_from_slice(conversation);
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use thicket_core::{EdgeKind, RelationshipDetail};

    fn method(id: u64, name: &str, code: &str) -> NodeDetail {
        let mut properties = serde_json::Map::new();
        properties.insert("name".into(), name.into());
        properties.insert("simple_name".into(), "load()".into());
        properties.insert("code".into(), code.into());
        NodeDetail {
            id: NodeId(id),
            labels: vec!["Method".into()],
            properties,
        }
    }

    fn cluster() -> ClusterDetail {
        ClusterDetail {
            nodes: vec![
                method(1, "app.Loader.load()", "load() {\n    parse();\n}"),
                method(2, "app.Loader.parse()", "parse() {\n}"),
            ],
            relationships: vec![RelationshipDetail {
                id: thicket_core::EdgeId(0),
                kind: EdgeKind::CallsMethod,
                start: NodeId(1),
                end: NodeId(2),
                properties: Default::default(),
            }],
        }
    }

    #[test]
    fn renders_nodes_code_and_relationships() {
        insta::assert_snapshot!(render_cluster(0, &cluster()), @r"
        ## Cluster 1
        - [Method] app.Loader.load()
          simple_name: load()
        ```java
        load() {
            parse();
        }
        ```
        - [Method] app.Loader.parse()
          simple_name: load()
        ```java
        parse() {
        }
        ```
        Relationships:
        - app.Loader.load() -[CALLS_METHOD]-> app.Loader.parse()
        ");
    }

    #[test]
    fn context_stops_at_the_budget() {
        let clusters = vec![cluster(), cluster(), cluster()];
        let full = digest_context(&clusters, 10_000);
        assert!(full.contains("## Cluster 3"));

        let tight = digest_context(&clusters, 100);
        assert!(tight.starts_with(SYSTEM_PREAMBLE));
        assert!(!tight.contains("## Cluster 3"));
    }

    #[test]
    fn context_leads_the_conversation() {
        let messages = with_context(&[cluster()], 10_000, &[ChatMessage::user("what calls parse?")]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content, "what calls parse?");
    }
}
