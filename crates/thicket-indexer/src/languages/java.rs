//! Java graph extractor
//!
//! Walks one compilation unit with an explicit [`TraversalContext`] and maps
//! declarations, calls and name references onto [`GraphWriter`] upserts.

use std::path::Path;

use thicket_core::{FieldDetail, GraphWriter, MethodDetail};
use tree_sitter::{Node, Tree};

use crate::context::TraversalContext;
use crate::error::Unresolved;
use crate::extractor::{Diagnostic, FileReport, LanguageExtractor};
use crate::resolver::ResolvedType;
use crate::session::ExtractionSession;
use crate::symbols::{
    ProjectIndex, TypeKind, body_members, clause_types, collect_file, field_decls, method_decl, qualified_name,
    type_parameters,
};
use crate::syntax::{TypeSyntax, child_of_kind, children_by_field, dedent, dimensions, end_line, named_children, start_line, text};

pub struct JavaExtractor;

impl LanguageExtractor for JavaExtractor {
    fn extract(&self, session: &ExtractionSession, path: &Path, tree: &Tree, source: &str) -> FileReport {
        let root = tree.root_node();
        let scope = session
            .index()
            .file_scope(path)
            .cloned()
            .unwrap_or_else(|| collect_file(path, root, source).0);

        let mut walk = Walk {
            session,
            source,
            file: path.display().to_string(),
            ctx: TraversalContext::new(scope),
            report: FileReport {
                path: path.to_path_buf(),
                ..FileReport::default()
            },
        };
        walk.compilation_unit(root);
        walk.report
    }
}

struct Walk<'s> {
    session: &'s ExtractionSession,
    source: &'s str,
    file: String,
    ctx: TraversalContext,
    report: FileReport,
}

/// Whether an identifier is used as an expression value rather than as a
/// declaration name, label, member name or type name.
fn is_expression_identifier(node: Node) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    let is_field = |field: &str| parent.child_by_field_name(field) == Some(node);
    match parent.kind() {
        "field_access" | "method_invocation" => is_field("object"),
        "variable_declarator" | "resource" => is_field("value"),
        "instanceof_expression" => is_field("left"),
        "cast_expression" => is_field("value"),
        "lambda_expression" => is_field("body"),
        "enhanced_for_statement" => is_field("value"),
        "method_reference" => parent.named_child(0) == Some(node),
        "assignment_expression"
        | "binary_expression"
        | "unary_expression"
        | "update_expression"
        | "parenthesized_expression"
        | "argument_list"
        | "return_statement"
        | "ternary_expression"
        | "array_access"
        | "expression_statement"
        | "array_initializer"
        | "dimensions_expr"
        | "throw_statement"
        | "yield_statement"
        | "synchronized_statement"
        | "switch_expression"
        | "guard" => true,
        _ => false,
    }
}

impl<'s> Walk<'s> {
    fn index(&self) -> &'s ProjectIndex {
        let session: &'s ExtractionSession = self.session;
        session.index()
    }

    fn writer(&self) -> &'s GraphWriter {
        let session: &'s ExtractionSession = self.session;
        session.writer()
    }

    fn text(&self, node: Node) -> &'s str {
        text(node, self.source)
    }

    fn unresolved(&mut self, node: Node, err: Unresolved) {
        let line = start_line(node);
        tracing::warn!(target: "thicket::unresolved", file = %self.file, line, "{err}");
        self.report.unresolved.push(Diagnostic {
            line,
            message: err.to_string(),
        });
    }

    fn resolve(&self, syntax: &TypeSyntax) -> Result<ResolvedType, Unresolved> {
        self.index().resolve_type(syntax, self.ctx.scope())
    }

    // ── Declarations ────────────────────────────────────────

    fn compilation_unit(&mut self, root: Node) {
        for child in named_children(root) {
            match child.kind() {
                "package_declaration" => {
                    if let Some(package) = qualified_name(child, self.source) {
                        self.writer().file_to_package(&self.file, &package);
                    }
                }
                "import_declaration" => {
                    if let Some(import) = qualified_name(child, self.source) {
                        self.writer().file_to_import(&self.file, &import);
                    }
                }
                kind if TypeKind::from_node_kind(kind).is_some() => self.type_declaration(child, None),
                _ => {}
            }
        }
    }

    fn type_declaration(&mut self, node: Node, outer: Option<&str>) {
        let Some(kind) = TypeKind::from_node_kind(node.kind()) else {
            return;
        };
        let Some(name) = node.child_by_field_name("name").map(|n| self.text(n)) else {
            return;
        };
        let fqn = match outer {
            Some(outer) => format!("{outer}.{name}"),
            None => self.ctx.file().qualify(name),
        };

        if !self.writer().insert_class(&fqn, kind.as_str()) {
            return;
        }
        self.report.classes += 1;
        self.writer().file_to_class(&self.file, &fqn);
        if let Some(outer) = outer {
            self.writer().class_to_class(outer, &fqn);
        }

        self.ctx.enter_class(fqn.clone(), &type_parameters(node, self.source));
        self.supertypes(node, kind, &fqn);

        if kind == TypeKind::Record {
            let components = node.child_by_field_name("parameters").map(named_children).unwrap_or_default();
            for component in components.into_iter().filter(|c| c.kind() == "formal_parameter") {
                let (Some(ty), Some(name)) = (component.child_by_field_name("type"), component.child_by_field_name("name")) else {
                    continue;
                };
                if let Some(syntax) = TypeSyntax::parse(ty, self.source) {
                    let name = self.text(name);
                    self.field(component, &fqn, name, &syntax, "");
                }
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            for member in body_members(body) {
                match member.kind() {
                    "field_declaration" | "constant_declaration" => self.field_declaration(member, &fqn),
                    "method_declaration" | "constructor_declaration" => self.executable(member, &fqn),
                    kind if TypeKind::from_node_kind(kind).is_some() => self.type_declaration(member, Some(&fqn)),
                    _ => {}
                }
            }
        }
        self.ctx.exit();
    }

    fn supertypes(&mut self, node: Node, kind: TypeKind, fqn: &str) {
        if let Some(superclass) = node
            .child_by_field_name("superclass")
            .and_then(|clause| clause_types(clause).into_iter().next())
        {
            if let Some(parent) = self.supertype(superclass) {
                self.writer().class_extends(fqn, &parent);
            }
        }

        let (clause, extends) = match kind {
            TypeKind::Interface => (child_of_kind(node, "extends_interfaces"), true),
            _ => (node.child_by_field_name("interfaces"), false),
        };
        for ty in clause.map(clause_types).unwrap_or_default() {
            let Some(parent) = self.supertype(ty) else {
                continue;
            };
            if extends {
                self.writer().class_extends(fqn, &parent);
            } else {
                self.writer().class_implements(fqn, &parent);
            }
        }
    }

    /// Qualified name of a supertype, or its description when it is not a class type.
    fn supertype(&mut self, ty: Node) -> Option<String> {
        let Some(syntax) = TypeSyntax::parse(ty, self.source) else {
            let err = Unresolved::new(self.text(ty), "not a type");
            self.unresolved(ty, err);
            return None;
        };
        match self.resolve(&syntax) {
            Ok(ResolvedType::Reference { qualified, .. }) => Some(qualified),
            Ok(other) => Some(other.describe()),
            Err(err) => {
                self.unresolved(ty, err);
                None
            }
        }
    }

    fn field_declaration(&mut self, node: Node, owner: &str) {
        let declarators = children_by_field(node, "declarator");
        for (decl, declarator) in field_decls(node, self.source).into_iter().zip(declarators) {
            let initial = declarator
                .child_by_field_name("value")
                .map(|value| self.text(value))
                .unwrap_or("");
            self.field(declarator, owner, &decl.name, &decl.ty, initial);
        }
    }

    fn field(&mut self, node: Node, owner: &str, name: &str, syntax: &TypeSyntax, initial: &str) {
        let resolved = match self.resolve(syntax) {
            Ok(resolved) => resolved,
            Err(err) => {
                self.unresolved(node, err);
                return;
            }
        };
        let detail = FieldDetail {
            name: name.to_string(),
            type_name: resolved.describe(),
            initial_value: initial.to_string(),
        };
        let written = match &resolved {
            ResolvedType::Primitive(_) => self.writer().class_to_field(owner, &detail),
            ResolvedType::Reference { qualified, .. } if self.session.namespaces().is_excluded(qualified) => {
                self.writer().class_to_field(owner, &detail)
            }
            ResolvedType::Reference { qualified, .. } => self.writer().class_to_field_to_class(owner, &detail, qualified),
            _ => {
                tracing::debug!(file = %self.file, "Skipping field {owner}.{name} of type {}", detail.type_name);
                return;
            }
        };
        if written {
            self.report.fields += 1;
        }
    }

    fn executable(&mut self, node: Node, owner: &str) {
        let Some(decl) = method_decl(node, self.source) else {
            let err = Unresolved::new(self.text(node), "malformed declaration");
            self.unresolved(node, err);
            return;
        };
        let signature = match self.index().signature(owner, &decl) {
            Ok(signature) => signature,
            Err(err) => {
                self.unresolved(node, err);
                return;
            }
        };

        let params: Vec<String> = decl
            .params
            .iter()
            .map(|p| if p.varargs { format!("{}...", p.ty.written()) } else { p.ty.written() })
            .collect();
        let body = node.child_by_field_name("body");
        let code = match body {
            Some(body) => format!("{}({}) {}", decl.name, params.join(", "), dedent(self.text(body))),
            None => format!("{}({})", decl.name, params.join(", ")),
        };
        let detail = MethodDetail {
            simple_name: format!("{}()", decl.name),
            file: self.file.clone(),
            start_line: start_line(node),
            end_line: end_line(node),
            code,
        };
        if !self.writer().insert_method(&signature, &detail) {
            return;
        }
        self.report.methods += 1;
        if decl.constructor {
            self.writer().class_to_constructor(owner, &signature);
        } else {
            self.writer().class_to_method(owner, &signature);
        }

        self.ctx.enter_executable(signature, decl.constructor, &decl.type_params);
        for param in &decl.params {
            let ty = self
                .resolve(&param.ty)
                .ok()
                .map(|ty| if param.varargs { ResolvedType::Array(Box::new(ty)) } else { ty });
            self.ctx.declare(param.name.as_str(), ty);
        }
        if let Some(body) = body {
            self.visit(body);
        }
        self.ctx.exit();
    }

    // ── Bodies ──────────────────────────────────────────────

    fn visit_children(&mut self, node: Node) {
        for child in named_children(node) {
            self.visit(child);
        }
    }

    fn scoped(&mut self, node: Node) {
        self.ctx.enter_block();
        self.visit_children(node);
        self.ctx.exit();
    }

    fn visit(&mut self, node: Node) {
        match node.kind() {
            "block" | "constructor_body" | "switch_block" | "switch_block_statement_group" | "for_statement"
            | "try_with_resources_statement" => self.scoped(node),
            "local_variable_declaration" => self.local_declaration(node),
            "enhanced_for_statement" => self.enhanced_for(node),
            "catch_clause" => self.catch_clause(node),
            "resource" => self.resource(node),
            "lambda_expression" => self.lambda(node),
            "instanceof_expression" => self.instanceof(node),
            "class_body" | "interface_body" | "enum_body" => self.local_class_body(node),
            "method_invocation" => {
                self.call(node);
                self.visit_children(node);
            }
            "identifier" => {
                if is_expression_identifier(node) {
                    self.reference(node);
                }
            }
            _ => self.visit_children(node),
        }
    }

    fn local_declaration(&mut self, node: Node) {
        let syntax = node
            .child_by_field_name("type")
            .and_then(|ty| TypeSyntax::parse(ty, self.source));
        for declarator in children_by_field(node, "declarator") {
            let Some(name) = declarator.child_by_field_name("name") else {
                continue;
            };
            let value = declarator.child_by_field_name("value");
            if let Some(value) = value {
                self.visit(value);
            }
            let dims = dimensions(declarator.child_by_field_name("dimensions"), self.source);
            let ty = match &syntax {
                Some(syntax) if syntax.is_inferred() => {
                    value.and_then(|value| self.index().type_of(value, self.source, &self.ctx).ok())
                }
                Some(syntax) => self.resolve(&syntax.clone().with_dimensions(dims)).ok(),
                None => None,
            };
            let name = self.text(name);
            self.ctx.declare(name, ty);
        }
    }

    fn enhanced_for(&mut self, node: Node) {
        let value = node.child_by_field_name("value");
        if let Some(value) = value {
            self.visit(value);
        }
        self.ctx.enter_block();
        if let Some(name) = node.child_by_field_name("name") {
            let syntax = node
                .child_by_field_name("type")
                .and_then(|ty| TypeSyntax::parse(ty, self.source));
            let ty = match syntax {
                Some(syntax) if syntax.is_inferred() => value
                    .and_then(|value| self.index().type_of(value, self.source, &self.ctx).ok())
                    .and_then(|iterable| iterable.element_type()),
                Some(syntax) => self.resolve(&syntax).ok(),
                None => None,
            };
            let name = self.text(name);
            self.ctx.declare(name, ty);
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.visit(body);
        }
        self.ctx.exit();
    }

    fn catch_clause(&mut self, node: Node) {
        self.ctx.enter_block();
        if let Some(param) = child_of_kind(node, "catch_formal_parameter") {
            let ty = child_of_kind(param, "catch_type")
                .and_then(|types| named_children(types).into_iter().next())
                .and_then(|ty| TypeSyntax::parse(ty, self.source))
                .and_then(|syntax| self.resolve(&syntax).ok());
            if let Some(name) = param.child_by_field_name("name") {
                let name = self.text(name);
                self.ctx.declare(name, ty);
            }
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.visit(body);
        }
        self.ctx.exit();
    }

    fn resource(&mut self, node: Node) {
        let value = node.child_by_field_name("value");
        match (node.child_by_field_name("type"), node.child_by_field_name("name")) {
            (Some(ty), Some(name)) => {
                if let Some(value) = value {
                    self.visit(value);
                }
                let ty = TypeSyntax::parse(ty, self.source).and_then(|syntax| {
                    if syntax.is_inferred() {
                        value.and_then(|value| self.index().type_of(value, self.source, &self.ctx).ok())
                    } else {
                        self.resolve(&syntax).ok()
                    }
                });
                let name = self.text(name);
                self.ctx.declare(name, ty);
            }
            _ => self.visit_children(node),
        }
    }

    fn lambda(&mut self, node: Node) {
        self.ctx.enter_block();
        if let Some(params) = node.child_by_field_name("parameters") {
            match params.kind() {
                "identifier" => {
                    let name = self.text(params);
                    self.ctx.declare(name, None);
                }
                _ => {
                    for param in named_children(params) {
                        match param.kind() {
                            "identifier" => {
                                let name = self.text(param);
                                self.ctx.declare(name, None);
                            }
                            "formal_parameter" => {
                                let ty = param
                                    .child_by_field_name("type")
                                    .and_then(|ty| TypeSyntax::parse(ty, self.source))
                                    .filter(|syntax| !syntax.is_inferred())
                                    .and_then(|syntax| self.resolve(&syntax).ok());
                                if let Some(name) = param.child_by_field_name("name") {
                                    let name = self.text(name);
                                    self.ctx.declare(name, ty);
                                }
                            }
                            _ => {}
                        }
                    }
                }
            }
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.visit(body);
        }
        self.ctx.exit();
    }

    /// Pattern variables (`x instanceof Foo f`) stay in scope for the rest of the enclosing block.
    fn instanceof(&mut self, node: Node) {
        self.visit_children(node);
        if let (Some(ty), Some(name)) = (node.child_by_field_name("right"), node.child_by_field_name("name")) {
            let ty = TypeSyntax::parse(ty, self.source).and_then(|syntax| self.resolve(&syntax).ok());
            let name = self.text(name);
            self.ctx.declare(name, ty);
        }
    }

    /// Anonymous and local class bodies are walked as nested scopes of the
    /// enclosing executable; their own fields and parameters act as locals.
    fn local_class_body(&mut self, body: Node) {
        self.ctx.enter_block();
        let members = body_members(body);
        for member in &members {
            if member.kind() == "field_declaration" {
                for field in field_decls(*member, self.source) {
                    let ty = self.resolve(&field.ty).ok();
                    self.ctx.declare(field.name, ty);
                }
            }
        }
        for member in members {
            match member.kind() {
                "method_declaration" | "constructor_declaration" => {
                    self.ctx.enter_block();
                    if let Some(decl) = method_decl(member, self.source) {
                        for param in &decl.params {
                            let ty = self.resolve(&param.ty).ok();
                            self.ctx.declare(param.name.as_str(), ty);
                        }
                    }
                    if let Some(body) = member.child_by_field_name("body") {
                        self.visit(body);
                    }
                    self.ctx.exit();
                }
                "field_declaration" => {
                    for declarator in children_by_field(member, "declarator") {
                        if let Some(value) = declarator.child_by_field_name("value") {
                            self.visit(value);
                        }
                    }
                }
                _ => self.visit(member),
            }
        }
        self.ctx.exit();
    }

    // ── Semantic edges ──────────────────────────────────────

    fn call(&mut self, node: Node) {
        let Some(caller) = self.ctx.current_executable().map(|e| e.signature.clone()) else {
            return;
        };
        match self.index().resolve_call(node, self.source, &self.ctx) {
            Ok(callee) => {
                if self.writer().method_calls_method(&caller, &callee) {
                    self.report.calls += 1;
                }
            }
            Err(err) => self.unresolved(node, err),
        }
    }

    fn reference(&mut self, node: Node) {
        let Some(method) = self.ctx.current_executable().map(|e| e.signature.clone()) else {
            return;
        };
        let name = self.text(node);
        if matches!(self.ctx.local(name), Some(None)) {
            return;
        }
        match self.index().variable_type(name, &self.ctx) {
            Ok(ResolvedType::Reference { qualified, .. }) => {
                if !self.session.namespaces().is_excluded(&qualified) && self.writer().method_uses_class(&method, &qualified) {
                    self.report.uses += 1;
                }
            }
            Ok(_) => {}
            // Static receivers such as `Math` in `Math.max(..)` are type names, not variables.
            Err(_) if self.index().resolve_type_name(name, self.ctx.scope()).is_some() => {}
            Err(err) => self.unresolved(node, err),
        }
    }
}
