//! Project symbol table: every type declared in the source tree
//!
//! Built once per project root in a parallel prepass, before any file is
//! extracted, and read-only afterwards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use rayon::prelude::*;
use tree_sitter::Node;

use crate::parser_pool::ParseResult;
use crate::syntax::{TypeSyntax, child_of_kind, children_by_field, dimensions, has_token, named_children, text};

/// Declaration kind of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
}

impl TypeKind {
    pub fn from_node_kind(kind: &str) -> Option<Self> {
        match kind {
            "class_declaration" => Some(TypeKind::Class),
            "interface_declaration" => Some(TypeKind::Interface),
            "enum_declaration" => Some(TypeKind::Enum),
            "record_declaration" => Some(TypeKind::Record),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Enum => "enum",
            TypeKind::Record => "record",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeSyntax,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub name: String,
    /// Element type for varargs parameters.
    pub ty: TypeSyntax,
    pub varargs: bool,
}

impl ParamDecl {
    /// Parameter type as it reads in a declaration signature; varargs read as arrays.
    pub fn written(&self) -> String {
        if self.varargs {
            format!("{}[]", self.ty.written())
        } else {
            self.ty.written()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub name: String,
    pub params: Vec<ParamDecl>,
    /// `None` for constructors.
    pub return_type: Option<TypeSyntax>,
    pub type_params: Vec<String>,
    pub constructor: bool,
}

impl MethodDecl {
    /// Whether a call with `arity` arguments can bind to this declaration.
    pub fn accepts(&self, arity: usize) -> bool {
        match self.params.last() {
            Some(last) if last.varargs => arity + 1 >= self.params.len(),
            _ => arity == self.params.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub fqn: String,
    pub name: String,
    pub kind: TypeKind,
    pub file: PathBuf,
    pub outer: Option<String>,
    /// Simple names of member types.
    pub nested: Vec<String>,
    pub type_params: Vec<String>,
    pub superclass: Option<TypeSyntax>,
    /// `implements` list, or `extends` list for interfaces.
    pub interfaces: Vec<TypeSyntax>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
}

/// Package and imports of one compilation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileScope {
    pub package: Option<String>,
    /// Single-type imports, fully qualified.
    pub imports: Vec<String>,
    /// On-demand imports (`import a.b.*;`), as `a.b`.
    pub on_demand: Vec<String>,
}

impl FileScope {
    pub fn qualify(&self, simple: &str) -> String {
        match &self.package {
            Some(package) => format!("{package}.{simple}"),
            None => simple.to_string(),
        }
    }
}

/// Read-only symbol table for a project.
#[derive(Debug, Default)]
pub struct ProjectIndex {
    pub(crate) types: HashMap<String, TypeDecl>,
    pub(crate) files: HashMap<PathBuf, FileScope>,
}

impl ProjectIndex {
    /// Collect declarations from every parsed file in parallel.
    pub fn build(parsed: &[ParseResult]) -> Self {
        let types: DashMap<String, TypeDecl> = DashMap::new();
        let files: DashMap<PathBuf, FileScope> = DashMap::new();

        parsed.par_iter().for_each(|file| {
            let (scope, decls) = collect_file(&file.path, file.tree.root_node(), &file.content);
            for decl in decls {
                if let Some(previous) = types.get(&decl.fqn) {
                    tracing::warn!(
                        "Type {} declared in both {} and {}",
                        decl.fqn,
                        previous.file.display(),
                        decl.file.display()
                    );
                    continue;
                }
                types.entry(decl.fqn.clone()).or_insert(decl);
            }
            files.insert(file.path.clone(), scope);
        });

        let index = Self {
            types: types.into_iter().collect(),
            files: files.into_iter().collect(),
        };
        tracing::debug!("Symbol table: {} types in {} files", index.types.len(), index.files.len());
        index
    }

    pub fn get(&self, fqn: &str) -> Option<&TypeDecl> {
        self.types.get(fqn)
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.types.contains_key(fqn)
    }

    pub fn file_scope(&self, path: &Path) -> Option<&FileScope> {
        self.files.get(path)
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

/// Collect the package, imports and type declarations of one compilation unit.
pub fn collect_file(path: &Path, root: Node, source: &str) -> (FileScope, Vec<TypeDecl>) {
    let mut scope = FileScope::default();
    let mut decls = Vec::new();

    for child in named_children(root) {
        match child.kind() {
            "package_declaration" => scope.package = qualified_name(child, source),
            "import_declaration" => {
                if has_token(child, "static") {
                    continue;
                }
                let Some(name) = qualified_name(child, source) else {
                    continue;
                };
                if child_of_kind(child, "asterisk").is_some() {
                    scope.on_demand.push(name);
                } else {
                    scope.imports.push(name);
                }
            }
            kind if TypeKind::from_node_kind(kind).is_some() => {
                let qualifier = scope.package.clone().unwrap_or_default();
                collect_type(child, source, path, &qualifier, None, &mut decls);
            }
            _ => {}
        }
    }
    (scope, decls)
}

/// Name of a package or import declaration.
pub fn qualified_name(node: Node, source: &str) -> Option<String> {
    named_children(node)
        .into_iter()
        .find(|c| matches!(c.kind(), "identifier" | "scoped_identifier"))
        .map(|n| text(n, source).split_whitespace().collect())
}

pub fn type_parameters(node: Node, source: &str) -> Vec<String> {
    node.child_by_field_name("type_parameters")
        .map(|list| {
            named_children(list)
                .into_iter()
                .filter(|p| p.kind() == "type_parameter")
                .filter_map(|p| child_of_kind(p, "type_identifier").or_else(|| child_of_kind(p, "identifier")))
                .map(|n| text(n, source).to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// The types listed in a `superclass`, `super_interfaces` or `extends_interfaces` clause.
pub fn clause_types<'t>(clause: Node<'t>) -> Vec<Node<'t>> {
    match child_of_kind(clause, "type_list") {
        Some(list) => named_children(list),
        None => named_children(clause),
    }
}

/// Members of a class, interface, enum or record body, flattening enum body declarations.
pub fn body_members(body: Node<'_>) -> Vec<Node<'_>> {
    let mut members = Vec::new();
    for child in named_children(body) {
        if child.kind() == "enum_body_declarations" {
            members.extend(named_children(child));
        } else {
            members.push(child);
        }
    }
    members
}

fn collect_type(
    node: Node,
    source: &str,
    path: &Path,
    qualifier: &str,
    outer: Option<&str>,
    out: &mut Vec<TypeDecl>,
) {
    let Some(kind) = TypeKind::from_node_kind(node.kind()) else {
        return;
    };
    let Some(name) = node.child_by_field_name("name").map(|n| text(n, source).to_string()) else {
        return;
    };
    let fqn = if qualifier.is_empty() {
        name.clone()
    } else {
        format!("{qualifier}.{name}")
    };

    let superclass = node
        .child_by_field_name("superclass")
        .and_then(|clause| clause_types(clause).into_iter().next())
        .and_then(|ty| TypeSyntax::parse(ty, source));
    let interfaces_clause = match kind {
        TypeKind::Interface => child_of_kind(node, "extends_interfaces"),
        _ => node.child_by_field_name("interfaces"),
    };
    let interfaces = interfaces_clause
        .map(|clause| {
            clause_types(clause)
                .into_iter()
                .filter_map(|ty| TypeSyntax::parse(ty, source))
                .collect()
        })
        .unwrap_or_default();

    let mut decl = TypeDecl {
        fqn: fqn.clone(),
        name,
        kind,
        file: path.to_path_buf(),
        outer: outer.map(str::to_string),
        nested: Vec::new(),
        type_params: type_parameters(node, source),
        superclass,
        interfaces,
        fields: Vec::new(),
        methods: Vec::new(),
    };

    if kind == TypeKind::Record {
        for param in node.child_by_field_name("parameters").map(parameters).unwrap_or_default() {
            let Some(param) = param_decl(param, source) else {
                continue;
            };
            decl.methods.push(MethodDecl {
                name: param.name.clone(),
                params: Vec::new(),
                return_type: Some(param.ty.clone()),
                type_params: Vec::new(),
                constructor: false,
            });
            decl.fields.push(FieldDecl {
                name: param.name,
                ty: param.ty,
            });
        }
    }

    let Some(body) = node.child_by_field_name("body") else {
        out.push(decl);
        return;
    };
    let mut nested = Vec::new();
    for member in body_members(body) {
        match member.kind() {
            "enum_constant" => {
                if let Some(constant) = member.child_by_field_name("name") {
                    decl.fields.push(FieldDecl {
                        name: text(constant, source).to_string(),
                        ty: TypeSyntax::named(fqn.clone()),
                    });
                }
            }
            "field_declaration" | "constant_declaration" => decl.fields.extend(field_decls(member, source)),
            "method_declaration" | "constructor_declaration" => {
                if let Some(method) = method_decl(member, source) {
                    decl.methods.push(method);
                }
            }
            kind if TypeKind::from_node_kind(kind).is_some() => nested.push(member),
            _ => {}
        }
    }

    for member in nested {
        if let Some(name) = member.child_by_field_name("name") {
            decl.nested.push(text(name, source).to_string());
        }
        collect_type(member, source, path, &fqn, Some(&fqn), out);
    }
    out.push(decl);
}

/// One `FieldDecl` per declarator, with C-style dimensions applied.
pub fn field_decls(node: Node, source: &str) -> Vec<FieldDecl> {
    let Some(ty) = node.child_by_field_name("type").and_then(|t| TypeSyntax::parse(t, source)) else {
        return Vec::new();
    };
    children_by_field(node, "declarator")
        .into_iter()
        .filter_map(|declarator| {
            let name = declarator.child_by_field_name("name")?;
            let dims = dimensions(declarator.child_by_field_name("dimensions"), source);
            Some(FieldDecl {
                name: text(name, source).to_string(),
                ty: ty.clone().with_dimensions(dims),
            })
        })
        .collect()
}

fn parameters(list: Node<'_>) -> Vec<Node<'_>> {
    named_children(list)
        .into_iter()
        .filter(|p| matches!(p.kind(), "formal_parameter" | "spread_parameter"))
        .collect()
}

fn param_decl(node: Node, source: &str) -> Option<ParamDecl> {
    if node.kind() == "spread_parameter" {
        let ty = named_children(node)
            .into_iter()
            .find_map(|c| TypeSyntax::parse(c, source))?;
        let declarator = child_of_kind(node, "variable_declarator")?;
        let name = declarator.child_by_field_name("name")?;
        return Some(ParamDecl {
            name: text(name, source).to_string(),
            ty,
            varargs: true,
        });
    }
    let ty = TypeSyntax::parse(node.child_by_field_name("type")?, source)?;
    let name = node.child_by_field_name("name")?;
    let dims = dimensions(node.child_by_field_name("dimensions"), source);
    Some(ParamDecl {
        name: text(name, source).to_string(),
        ty: ty.with_dimensions(dims),
        varargs: false,
    })
}

/// Declaration-level view of a method or constructor.
pub fn method_decl(node: Node, source: &str) -> Option<MethodDecl> {
    let constructor = match node.kind() {
        "method_declaration" => false,
        "constructor_declaration" => true,
        _ => return None,
    };
    let name = text(node.child_by_field_name("name")?, source).to_string();
    let params = node
        .child_by_field_name("parameters")
        .map(parameters)
        .unwrap_or_default()
        .into_iter()
        .map(|p| param_decl(p, source))
        .collect::<Option<Vec<_>>>()?;
    let return_type = if constructor {
        None
    } else {
        node.child_by_field_name("type").and_then(|t| TypeSyntax::parse(t, source))
    };
    Some(MethodDecl {
        name,
        params,
        return_type,
        type_params: type_parameters(node, source),
        constructor,
    })
}
