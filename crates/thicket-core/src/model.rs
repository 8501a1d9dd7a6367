//! Graph schema: node labels, relationship kinds and property values

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Surrogate node identifier. Only meaningful for the lifetime of one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Surrogate relationship identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct EdgeId(pub u64);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discriminates what kind of code entity a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeLabel {
    // ── Filesystem ──────────────────────────────────────────
    Directory,
    File,

    // ── Compilation unit ────────────────────────────────────
    Package,
    Import,

    // ── Declarations ────────────────────────────────────────
    Class,
    Field,
    /// Methods and constructors alike.
    Method,
}

impl NodeLabel {
    pub const ALL: [NodeLabel; 7] = [
        NodeLabel::Directory,
        NodeLabel::File,
        NodeLabel::Package,
        NodeLabel::Import,
        NodeLabel::Class,
        NodeLabel::Field,
        NodeLabel::Method,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeLabel::Directory => "Directory",
            NodeLabel::File => "File",
            NodeLabel::Package => "Package",
            NodeLabel::Import => "Import",
            NodeLabel::Class => "Class",
            NodeLabel::Field => "Field",
            NodeLabel::Method => "Method",
        }
    }

    /// The property holding the natural key of nodes with this label.
    pub fn key_property(self) -> &'static str {
        match self {
            NodeLabel::Directory | NodeLabel::File => "path",
            NodeLabel::Field => "qualified_name",
            NodeLabel::Package | NodeLabel::Import | NodeLabel::Class | NodeLabel::Method => "name",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|label| label.as_str() == s)
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of relationship an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    // ── Filesystem containment ──────────────────────────────
    HasDir,
    HasFile,

    // ── Compilation unit ────────────────────────────────────
    HasClass,
    HasImport,
    InPackage,

    // ── Members ─────────────────────────────────────────────
    HasMethod,
    HasConstructor,
    HasField,
    HasType,

    // ── Type hierarchy ──────────────────────────────────────
    Extends,
    Implements,

    // ── Semantic (from method bodies) ───────────────────────
    CallsMethod,
    UsesClass,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 13] = [
        EdgeKind::HasDir,
        EdgeKind::HasFile,
        EdgeKind::HasClass,
        EdgeKind::HasImport,
        EdgeKind::InPackage,
        EdgeKind::HasMethod,
        EdgeKind::HasConstructor,
        EdgeKind::HasField,
        EdgeKind::HasType,
        EdgeKind::Extends,
        EdgeKind::Implements,
        EdgeKind::CallsMethod,
        EdgeKind::UsesClass,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::HasDir => "HAS_DIR",
            EdgeKind::HasFile => "HAS_FILE",
            EdgeKind::HasClass => "HAS_CLASS",
            EdgeKind::HasImport => "HAS_IMPORT",
            EdgeKind::InPackage => "IN_PACKAGE",
            EdgeKind::HasMethod => "HAS_METHOD",
            EdgeKind::HasConstructor => "HAS_CONSTRUCTOR",
            EdgeKind::HasField => "HAS_FIELD",
            EdgeKind::HasType => "HAS_TYPE",
            EdgeKind::Extends => "EXTENDS",
            EdgeKind::Implements => "IMPLEMENTS",
            EdgeKind::CallsMethod => "CALLS_METHOD",
            EdgeKind::UsesClass => "USES_CLASS",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed node or relationship attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Vector(Vec<f32>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            PropertyValue::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PropertyValue::Null => serde_json::Value::Null,
            PropertyValue::Bool(b) => serde_json::Value::Bool(*b),
            PropertyValue::Int(i) => serde_json::Value::from(*i),
            PropertyValue::Float(f) => serde_json::Value::from(*f),
            PropertyValue::Str(s) => serde_json::Value::String(s.clone()),
            PropertyValue::Vector(v) => v.iter().map(|x| serde_json::Value::from(f64::from(*x))).collect(),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Str(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Str(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Int(i)
    }
}

impl From<u32> for PropertyValue {
    fn from(i: u32) -> Self {
        PropertyValue::Int(i64::from(i))
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<Vec<f32>> for PropertyValue {
    fn from(v: Vec<f32>) -> Self {
        PropertyValue::Vector(v)
    }
}

/// Ordered attribute map; ordering keeps hydrated output deterministic.
pub type Properties = BTreeMap<String, PropertyValue>;

/// The natural identity of a node: its label plus the value of the label's key property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeKey {
    pub label: NodeLabel,
    pub key: String,
}

impl NodeKey {
    pub fn new(label: NodeLabel, key: impl Into<String>) -> Self {
        Self { label, key: key.into() }
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self::new(NodeLabel::Directory, path)
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self::new(NodeLabel::File, path)
    }

    pub fn package(name: impl Into<String>) -> Self {
        Self::new(NodeLabel::Package, name)
    }

    pub fn import(name: impl Into<String>) -> Self {
        Self::new(NodeLabel::Import, name)
    }

    pub fn class(qualified_name: impl Into<String>) -> Self {
        Self::new(NodeLabel::Class, qualified_name)
    }

    /// Fields are keyed by their owner so equal names in different classes stay distinct.
    pub fn field(owner: &str, name: &str) -> Self {
        Self::new(NodeLabel::Field, format!("{owner}.{name}"))
    }

    pub fn method(signature: impl Into<String>) -> Self {
        Self::new(NodeLabel::Method, signature)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.label, self.key)
    }
}

/// A node as held by the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub label: NodeLabel,
    pub key: String,
    pub properties: Properties,
}

impl NodeRecord {
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn node_key(&self) -> NodeKey {
        NodeKey::new(self.label, self.key.clone())
    }
}

/// A relationship as held by the graph. Identity is (start, end, kind).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub kind: EdgeKind,
    pub properties: Properties,
}
