//! Helpers over tree-sitter-java syntax nodes

use tree_sitter::Node;

pub fn text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// 1-based line of the node's first character.
pub fn start_line(node: Node) -> u32 {
    node.start_position().row as u32 + 1
}

/// 1-based line of the node's last character.
pub fn end_line(node: Node) -> u32 {
    node.end_position().row as u32 + 1
}

pub fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub fn children_by_field<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

pub fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    named_children(node).into_iter().find(|c| c.kind() == kind)
}

/// Whether an anonymous token such as `static` or `super` appears among the node's children.
pub fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| !c.is_named() && c.kind() == token);
    found
}

/// Number of `[]` pairs in a `dimensions` node.
pub fn dimensions(node: Option<Node>, source: &str) -> usize {
    node.map_or(0, |n| text(n, source).matches('[').count())
}

/// Strip the common indentation of every line after the first and trailing whitespace.
pub fn dedent(block: &str) -> String {
    let mut lines = block.lines();
    let Some(first) = lines.next() else {
        return String::new();
    };
    let rest: Vec<&str> = lines.collect();
    let indent = rest
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out = first.trim_end().to_string();
    for line in rest {
        out.push('\n');
        out.push_str(line.get(indent..).unwrap_or_else(|| line.trim_start()).trim_end());
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    Extends,
    Super,
}

/// A type as written in source, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSyntax {
    Primitive(String),
    /// Possibly dotted name with the type arguments of its last segment.
    Named { name: String, args: Vec<TypeSyntax> },
    Array { element: Box<TypeSyntax>, dimensions: usize },
    Wildcard { bound: Option<(BoundKind, Box<TypeSyntax>)> },
}

impl TypeSyntax {
    pub fn named(name: impl Into<String>) -> Self {
        TypeSyntax::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn parse(node: Node, source: &str) -> Option<Self> {
        match node.kind() {
            "integral_type" | "floating_point_type" | "boolean_type" | "void_type" => {
                Some(TypeSyntax::Primitive(text(node, source).to_string()))
            }
            "type_identifier" | "scoped_type_identifier" => Some(TypeSyntax::named(scoped_name(node, source))),
            "generic_type" => {
                let base = named_children(node)
                    .into_iter()
                    .find(|c| matches!(c.kind(), "type_identifier" | "scoped_type_identifier"))?;
                let args = child_of_kind(node, "type_arguments")
                    .map(|list| {
                        named_children(list)
                            .into_iter()
                            .filter_map(|arg| TypeSyntax::parse(arg, source))
                            .collect()
                    })
                    .unwrap_or_default();
                Some(TypeSyntax::Named {
                    name: scoped_name(base, source),
                    args,
                })
            }
            "array_type" => {
                let element = TypeSyntax::parse(node.child_by_field_name("element")?, source)?;
                let dims = dimensions(node.child_by_field_name("dimensions"), source).max(1);
                Some(element.with_dimensions(dims))
            }
            "annotated_type" => {
                let inner = named_children(node)
                    .into_iter()
                    .rev()
                    .find(|c| !matches!(c.kind(), "annotation" | "marker_annotation"))?;
                TypeSyntax::parse(inner, source)
            }
            "wildcard" => {
                let bound = named_children(node)
                    .into_iter()
                    .rev()
                    .find(|c| !matches!(c.kind(), "annotation" | "marker_annotation"))
                    .and_then(|b| TypeSyntax::parse(b, source));
                let kind = if has_token(node, "super") {
                    BoundKind::Super
                } else {
                    BoundKind::Extends
                };
                Some(TypeSyntax::Wildcard {
                    bound: bound.map(|b| (kind, Box::new(b))),
                })
            }
            _ => None,
        }
    }

    /// Wrap in `dims` array levels (for C-style `int x[]` declarators).
    pub fn with_dimensions(self, dims: usize) -> Self {
        if dims == 0 {
            return self;
        }
        match self {
            TypeSyntax::Array { element, dimensions } => TypeSyntax::Array {
                element,
                dimensions: dimensions + dims,
            },
            other => TypeSyntax::Array {
                element: Box::new(other),
                dimensions: dims,
            },
        }
    }

    /// `var` in a local declaration.
    pub fn is_inferred(&self) -> bool {
        matches!(self, TypeSyntax::Named { name, args } if name == "var" && args.is_empty())
    }

    /// The type as written, normalised to single spaces.
    pub fn written(&self) -> String {
        match self {
            TypeSyntax::Primitive(p) => p.clone(),
            TypeSyntax::Named { name, args } if args.is_empty() => name.clone(),
            TypeSyntax::Named { name, args } => {
                let args: Vec<String> = args.iter().map(TypeSyntax::written).collect();
                format!("{name}<{}>", args.join(", "))
            }
            TypeSyntax::Array { element, dimensions } => format!("{}{}", element.written(), "[]".repeat(*dimensions)),
            TypeSyntax::Wildcard { bound: None } => "?".to_string(),
            TypeSyntax::Wildcard {
                bound: Some((kind, bound)),
            } => {
                let keyword = match kind {
                    BoundKind::Extends => "extends",
                    BoundKind::Super => "super",
                };
                format!("? {keyword} {}", bound.written())
            }
        }
    }
}

/// Dotted name of a (possibly scoped or generic) type identifier, without type arguments.
fn scoped_name(node: Node, source: &str) -> String {
    match node.kind() {
        "scoped_type_identifier" | "generic_type" => named_children(node)
            .into_iter()
            .filter(|c| matches!(c.kind(), "type_identifier" | "scoped_type_identifier" | "generic_type"))
            .map(|c| scoped_name(c, source))
            .collect::<Vec<_>>()
            .join("."),
        _ => text(node, source).to_string(),
    }
}
