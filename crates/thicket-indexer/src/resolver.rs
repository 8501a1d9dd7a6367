//! Symbol resolution over the project index
//!
//! Resolution is deliberately shallow: names are looked up through the
//! enclosing types, imports, package and `java.lang`; member lookup walks
//! project supertypes; overloads are ranked by argument types when those can
//! be computed. Anything beyond that is reported as [`Unresolved`].

use std::collections::{HashSet, VecDeque};

use tree_sitter::Node;

use crate::context::TraversalContext;
use crate::error::Unresolved;
use crate::symbols::{FieldDecl, FileScope, MethodDecl, ParamDecl, ProjectIndex, TypeDecl};
use crate::syntax::{BoundKind, TypeSyntax, child_of_kind, dimensions, named_children, text};

/// Implicitly imported `java.lang` types.
const JAVA_LANG: &[&str] = &[
    "AutoCloseable", "Boolean", "Byte", "Character", "CharSequence", "Class", "ClassCastException",
    "Cloneable", "CloneNotSupportedException", "Comparable", "Deprecated", "Double", "Enum", "Error",
    "Exception", "Float", "FunctionalInterface", "IllegalArgumentException", "IllegalStateException",
    "IndexOutOfBoundsException", "Integer", "InterruptedException", "Iterable", "Long", "Math",
    "NullPointerException", "Number", "NumberFormatException", "Object", "Override", "Process",
    "ProcessBuilder", "Record", "Runnable", "Runtime", "RuntimeException", "SafeVarargs", "Short",
    "StackTraceElement", "String", "StringBuffer", "StringBuilder", "SuppressWarnings", "System",
    "Thread", "ThreadLocal", "Throwable", "UnsupportedOperationException", "Void",
];

/// Platform packages commonly pulled in with on-demand imports.
const PLATFORM_PACKAGES: &[(&str, &[&str])] = &[
    (
        "java.util",
        &[
            "ArrayDeque", "ArrayList", "Arrays", "Collection", "Collections", "Comparator", "Date", "Deque",
            "HashMap", "HashSet", "Iterator", "LinkedHashMap", "LinkedHashSet", "LinkedList", "List", "Locale",
            "Map", "Objects", "Optional", "Properties", "Queue", "Random", "Scanner", "Set", "TreeMap",
            "TreeSet", "UUID",
        ],
    ),
    (
        "java.util.function",
        &[
            "BiConsumer", "BiFunction", "BinaryOperator", "BiPredicate", "Consumer", "Function", "Predicate",
            "Supplier", "UnaryOperator",
        ],
    ),
    ("java.util.stream", &["Collectors", "IntStream", "Stream"]),
    (
        "java.util.concurrent",
        &[
            "Callable", "CompletableFuture", "ConcurrentHashMap", "ExecutorService", "Executors", "Future",
            "TimeUnit",
        ],
    ),
    (
        "java.io",
        &[
            "BufferedReader", "BufferedWriter", "Closeable", "File", "FileInputStream", "FileOutputStream",
            "FileReader", "FileWriter", "IOException", "InputStream", "InputStreamReader", "OutputStream",
            "PrintStream", "PrintWriter", "Reader", "Serializable", "UncheckedIOException", "Writer",
        ],
    ),
    ("java.nio.file", &["Files", "Path", "Paths"]),
    ("java.nio.charset", &["Charset", "StandardCharsets"]),
    ("java.time", &["Duration", "Instant", "LocalDate", "LocalDateTime"]),
];

const OBJECT: &str = "java.lang.Object";

static EMPTY_SCOPE: FileScope = FileScope {
    package: None,
    imports: Vec::new(),
    on_demand: Vec::new(),
};

fn is_platform_type(package: &str, simple: &str) -> bool {
    PLATFORM_PACKAGES
        .iter()
        .any(|(p, names)| *p == package && names.contains(&simple))
}

/// A fully resolved type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedType {
    Primitive(String),
    Reference { qualified: String, args: Vec<ResolvedType> },
    Array(Box<ResolvedType>),
    TypeVariable(String),
    Wildcard(Option<(BoundKind, Box<ResolvedType>)>),
    /// Type of the `null` literal.
    Null,
}

impl ResolvedType {
    pub fn reference(qualified: impl Into<String>) -> Self {
        ResolvedType::Reference {
            qualified: qualified.into(),
            args: Vec::new(),
        }
    }

    fn primitive(name: &str) -> Self {
        ResolvedType::Primitive(name.to_string())
    }

    /// Qualified name of a class or interface type, without type arguments.
    pub fn qualified_name(&self) -> Option<&str> {
        match self {
            ResolvedType::Reference { qualified, .. } => Some(qualified),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ResolvedType::Primitive(p) => p.clone(),
            ResolvedType::Reference { qualified, args } if args.is_empty() => qualified.clone(),
            ResolvedType::Reference { qualified, args } => {
                let args: Vec<String> = args.iter().map(ResolvedType::describe).collect();
                format!("{qualified}<{}>", args.join(", "))
            }
            ResolvedType::Array(element) => format!("{}[]", element.describe()),
            ResolvedType::TypeVariable(name) => name.clone(),
            ResolvedType::Wildcard(None) => "?".to_string(),
            ResolvedType::Wildcard(Some((BoundKind::Extends, bound))) => format!("? extends {}", bound.describe()),
            ResolvedType::Wildcard(Some((BoundKind::Super, bound))) => format!("? super {}", bound.describe()),
            ResolvedType::Null => "null".to_string(),
        }
    }

    fn substitute(self, vars: &[String], args: &[ResolvedType]) -> Self {
        match self {
            ResolvedType::TypeVariable(name) => match vars.iter().position(|v| *v == name) {
                Some(i) => args[i].clone(),
                None => ResolvedType::TypeVariable(name),
            },
            ResolvedType::Reference { qualified, args: inner } => ResolvedType::Reference {
                qualified,
                args: inner.into_iter().map(|a| a.substitute(vars, args)).collect(),
            },
            ResolvedType::Array(element) => ResolvedType::Array(Box::new(element.substitute(vars, args))),
            other => other,
        }
    }

    /// Element type when iterating with an enhanced `for`.
    pub fn element_type(&self) -> Option<ResolvedType> {
        match self {
            ResolvedType::Array(element) => Some((**element).clone()),
            ResolvedType::Reference { args, .. } if args.len() == 1 => match &args[0] {
                ResolvedType::Wildcard(Some((BoundKind::Extends, bound))) => Some((**bound).clone()),
                ResolvedType::Wildcard(_) => None,
                arg => Some(arg.clone()),
            },
            _ => None,
        }
    }
}

/// Where a simple type name is being resolved.
#[derive(Debug, Clone, Copy)]
pub struct TypeScope<'a> {
    pub file: &'a FileScope,
    /// Enclosing type declarations, outermost first.
    pub enclosing: &'a [String],
    pub type_vars: &'a [String],
}

/// A scope computed for a declaration rather than taken from a live traversal.
struct DeclScope<'a> {
    file: &'a FileScope,
    enclosing: Vec<String>,
    type_vars: Vec<String>,
}

impl DeclScope<'_> {
    fn with_type_vars(mut self, vars: &[String]) -> Self {
        self.type_vars.extend(vars.iter().cloned());
        self
    }

    fn view(&self) -> TypeScope<'_> {
        TypeScope {
            file: self.file,
            enclosing: &self.enclosing,
            type_vars: &self.type_vars,
        }
    }
}

enum Receiver {
    Instance(ResolvedType),
    Static(String),
}

fn unbox(qualified: &str) -> Option<&'static str> {
    Some(match qualified {
        "java.lang.Boolean" => "boolean",
        "java.lang.Byte" => "byte",
        "java.lang.Character" => "char",
        "java.lang.Short" => "short",
        "java.lang.Integer" => "int",
        "java.lang.Long" => "long",
        "java.lang.Float" => "float",
        "java.lang.Double" => "double",
        _ => return None,
    })
}

fn boxed(primitive: &str) -> Option<&'static str> {
    Some(match primitive {
        "boolean" => "java.lang.Boolean",
        "byte" => "java.lang.Byte",
        "char" => "java.lang.Character",
        "short" => "java.lang.Short",
        "int" => "java.lang.Integer",
        "long" => "java.lang.Long",
        "float" => "java.lang.Float",
        "double" => "java.lang.Double",
        _ => return None,
    })
}

fn numeric_rank(primitive: &str) -> Option<u8> {
    match primitive {
        "byte" => Some(1),
        "short" | "char" => Some(2),
        "int" => Some(3),
        "long" => Some(4),
        "float" => Some(5),
        "double" => Some(6),
        _ => None,
    }
}

/// Primitive widening conversion.
fn widens(from: &str, to: &str) -> bool {
    if from == to {
        return true;
    }
    match (numeric_rank(from), numeric_rank(to)) {
        (Some(a), Some(b)) => a < b && to != "char" && !(from == "char" && to == "short"),
        _ => false,
    }
}

impl ProjectIndex {
    /// The type's declaration chain, outermost first.
    fn chain(&self, fqn: &str) -> Vec<&TypeDecl> {
        let mut chain = Vec::new();
        let mut current = self.get(fqn);
        while let Some(decl) = current {
            chain.push(decl);
            current = decl.outer.as_deref().and_then(|outer| self.get(outer));
        }
        chain.reverse();
        chain
    }

    fn decl_scope(&self, fqn: &str, include_self: bool) -> DeclScope<'_> {
        let chain = self.chain(fqn);
        let file = chain
            .first()
            .and_then(|decl| self.file_scope(&decl.file))
            .unwrap_or(&EMPTY_SCOPE);
        let visible = if include_self {
            chain.len()
        } else {
            chain.len().saturating_sub(1)
        };
        DeclScope {
            file,
            enclosing: chain[..visible].iter().map(|d| d.fqn.clone()).collect(),
            type_vars: chain.iter().flat_map(|d| d.type_params.iter().cloned()).collect(),
        }
    }

    /// Scope inside a type's body.
    fn member_scope(&self, fqn: &str) -> DeclScope<'_> {
        self.decl_scope(fqn, true)
    }

    /// Scope of a type's `extends`/`implements` clauses.
    fn header_scope(&self, fqn: &str) -> DeclScope<'_> {
        self.decl_scope(fqn, false)
    }

    /// Directly declared supertypes of a project type.
    pub fn supertypes(&self, fqn: &str) -> Vec<String> {
        let Some(decl) = self.get(fqn) else {
            return Vec::new();
        };
        let scope = self.header_scope(fqn);
        decl.superclass
            .iter()
            .chain(&decl.interfaces)
            .filter_map(|syntax| match self.resolve_type(syntax, scope.view()) {
                Ok(ResolvedType::Reference { qualified, .. }) => Some(qualified),
                _ => None,
            })
            .collect()
    }

    fn superclass(&self, fqn: &str) -> Option<String> {
        let decl = self.get(fqn)?;
        let syntax = decl.superclass.as_ref()?;
        let scope = self.header_scope(fqn);
        self.resolve_type(syntax, scope.view())
            .ok()?
            .qualified_name()
            .map(str::to_string)
    }

    /// The type followed by its supertypes, breadth first. Only project types are expanded.
    pub fn hierarchy(&self, fqn: &str) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::from([fqn.to_string()]);
        let mut order = vec![fqn.to_string()];
        let mut queue = VecDeque::from([fqn.to_string()]);
        while let Some(current) = queue.pop_front() {
            for parent in self.supertypes(&current) {
                if seen.insert(parent.clone()) {
                    order.push(parent.clone());
                    queue.push_back(parent);
                }
            }
        }
        order
    }

    fn member_type(&self, owner: &str, simple: &str) -> Option<String> {
        self.hierarchy(owner)
            .into_iter()
            .map(|ty| format!("{ty}.{simple}"))
            .find(|candidate| self.contains(candidate))
    }

    fn resolve_simple(&self, simple: &str, scope: TypeScope<'_>) -> Option<String> {
        for outer in scope.enclosing.iter().rev() {
            if self.get(outer).is_some_and(|decl| decl.name == simple) {
                return Some(outer.clone());
            }
            if let Some(found) = self.member_type(outer, simple) {
                return Some(found);
            }
        }
        if let Some(import) = scope
            .file
            .imports
            .iter()
            .find(|import| import.rsplit('.').next() == Some(simple))
        {
            return Some(import.clone());
        }
        let same_package = scope.file.qualify(simple);
        if self.contains(&same_package) {
            return Some(same_package);
        }
        for package in &scope.file.on_demand {
            let candidate = format!("{package}.{simple}");
            if self.contains(&candidate) || is_platform_type(package, simple) {
                return Some(candidate);
            }
        }
        JAVA_LANG.contains(&simple).then(|| format!("java.lang.{simple}"))
    }

    /// A dotted name that did not start with a visible simple name: treat it as package-qualified.
    fn resolve_qualified(&self, name: &str) -> Option<String> {
        if self.contains(name) {
            return Some(name.to_string());
        }
        let segments: Vec<&str> = name.split('.').collect();
        for split in (1..segments.len()).rev() {
            let prefix = segments[..split].join(".");
            if self.contains(&prefix) {
                return Some(self.nested_path(prefix, &segments[split..]));
            }
        }
        segments[0]
            .chars()
            .next()
            .is_some_and(char::is_lowercase)
            .then(|| name.to_string())
    }

    fn nested_path(&self, base: String, rest: &[&str]) -> String {
        rest.iter().fold(base, |acc, segment| {
            self.member_type(&acc, segment)
                .unwrap_or_else(|| format!("{acc}.{segment}"))
        })
    }

    /// Resolve a possibly dotted type name to its qualified name.
    pub fn resolve_type_name(&self, name: &str, scope: TypeScope<'_>) -> Option<String> {
        let mut segments = name.split('.');
        let head = segments.next()?;
        let rest: Vec<&str> = segments.collect();
        match self.resolve_simple(head, scope) {
            Some(base) => Some(self.nested_path(base, &rest)),
            None if !rest.is_empty() => self.resolve_qualified(name),
            None => None,
        }
    }

    pub fn resolve_type(&self, syntax: &TypeSyntax, scope: TypeScope<'_>) -> Result<ResolvedType, Unresolved> {
        match syntax {
            TypeSyntax::Primitive(p) => Ok(ResolvedType::Primitive(p.clone())),
            TypeSyntax::Array { element, dimensions } => {
                let mut ty = self.resolve_type(element, scope)?;
                for _ in 0..*dimensions {
                    ty = ResolvedType::Array(Box::new(ty));
                }
                Ok(ty)
            }
            TypeSyntax::Named { name, args } => {
                if args.is_empty() && scope.type_vars.iter().any(|v| v == name) {
                    return Ok(ResolvedType::TypeVariable(name.clone()));
                }
                let qualified = self
                    .resolve_type_name(name, scope)
                    .ok_or_else(|| Unresolved::new(syntax.written(), "unknown type"))?;
                let args = args
                    .iter()
                    .map(|arg| self.resolve_type(arg, scope))
                    .collect::<Result<_, _>>()?;
                Ok(ResolvedType::Reference { qualified, args })
            }
            TypeSyntax::Wildcard { bound: None } => Ok(ResolvedType::Wildcard(None)),
            TypeSyntax::Wildcard {
                bound: Some((kind, bound)),
            } => Ok(ResolvedType::Wildcard(Some((*kind, Box::new(self.resolve_type(bound, scope)?))))),
        }
    }

    /// Qualified signature of a method or constructor declared in `declaring`:
    /// `<declaring>.<name>(<param type>, ...)`.
    pub fn signature(&self, declaring: &str, method: &MethodDecl) -> Result<String, Unresolved> {
        let scope = self.member_scope(declaring).with_type_vars(&method.type_params);
        let params = method
            .params
            .iter()
            .map(|param| {
                let described = self.resolve_type(&param.ty, scope.view())?.describe();
                Ok(if param.varargs {
                    format!("{described}...")
                } else {
                    described
                })
            })
            .collect::<Result<Vec<_>, Unresolved>>()?;
        Ok(format!("{declaring}.{}({})", method.name, params.join(", ")))
    }

    /// Resolve a parameter or local declared inside `declaring`'s body.
    pub fn resolve_in_member(
        &self,
        declaring: &str,
        syntax: &TypeSyntax,
        method_type_params: &[String],
    ) -> Result<ResolvedType, Unresolved> {
        let scope = self.member_scope(declaring).with_type_vars(method_type_params);
        self.resolve_type(syntax, scope.view())
    }

    pub fn find_field(&self, owner: &str, name: &str) -> Option<(&TypeDecl, &FieldDecl)> {
        self.hierarchy(owner).into_iter().find_map(|ty| {
            let decl = self.get(&ty)?;
            let field = decl.fields.iter().find(|f| f.name == name)?;
            Some((decl, field))
        })
    }

    fn field_type(&self, decl: &TypeDecl, field: &FieldDecl) -> Result<ResolvedType, Unresolved> {
        let scope = self.member_scope(&decl.fqn);
        self.resolve_type(&field.ty, scope.view())
    }

    /// Methods named `name` callable with `arity` arguments, most derived first.
    fn candidates(&self, owner: &str, name: &str, arity: usize) -> Vec<(&TypeDecl, &MethodDecl)> {
        let mut seen: HashSet<Vec<String>> = HashSet::new();
        let mut out = Vec::new();
        for ty in self.hierarchy(owner) {
            let Some(decl) = self.get(&ty) else {
                continue;
            };
            for method in &decl.methods {
                if method.constructor || method.name != name || !method.accepts(arity) {
                    continue;
                }
                let key = method.params.iter().map(ParamDecl::written).collect();
                if seen.insert(key) {
                    out.push((decl, method));
                }
            }
        }
        out
    }

    /// Type of a local, parameter or (possibly inherited) field visible from the context.
    pub fn variable_type(&self, name: &str, ctx: &TraversalContext) -> Result<ResolvedType, Unresolved> {
        if let Some(local) = ctx.local(name) {
            return local
                .cloned()
                .ok_or_else(|| Unresolved::new(name, "variable type could not be inferred"));
        }
        for class in ctx.classes().iter().rev() {
            if let Some((decl, field)) = self.find_field(class, name) {
                return self.field_type(decl, field);
            }
        }
        Err(Unresolved::new(name, "not a variable in scope"))
    }

    /// Static type of an expression.
    pub fn type_of(&self, expr: Node, source: &str, ctx: &TraversalContext) -> Result<ResolvedType, Unresolved> {
        let unknown = || Unresolved::new(text(expr, source), "expression type unknown");
        let child = |field: &str| expr.child_by_field_name(field).ok_or_else(unknown);
        let written_type = |node: Node| {
            TypeSyntax::parse(node, source)
                .ok_or_else(unknown)
                .and_then(|syntax| self.resolve_type(&syntax, ctx.scope()))
        };

        match expr.kind() {
            "identifier" => self.variable_type(text(expr, source), ctx),
            "this" => ctx
                .current_class()
                .map(ResolvedType::reference)
                .ok_or_else(unknown),
            "string_literal" | "text_block" => Ok(ResolvedType::reference("java.lang.String")),
            "decimal_integer_literal" | "hex_integer_literal" | "octal_integer_literal" | "binary_integer_literal" => {
                let long = text(expr, source).ends_with(['l', 'L']);
                Ok(ResolvedType::primitive(if long { "long" } else { "int" }))
            }
            "decimal_floating_point_literal" | "hex_floating_point_literal" => {
                let float = text(expr, source).ends_with(['f', 'F']);
                Ok(ResolvedType::primitive(if float { "float" } else { "double" }))
            }
            "true" | "false" | "instanceof_expression" => Ok(ResolvedType::primitive("boolean")),
            "character_literal" => Ok(ResolvedType::primitive("char")),
            "null_literal" => Ok(ResolvedType::Null),
            "class_literal" => Ok(ResolvedType::reference("java.lang.Class")),
            "parenthesized_expression" => {
                let inner = named_children(expr).into_iter().next().ok_or_else(unknown)?;
                self.type_of(inner, source, ctx)
            }
            "cast_expression" | "object_creation_expression" => written_type(child("type")?),
            "array_creation_expression" => {
                let element = written_type(child("type")?)?;
                let dims = named_children(expr)
                    .iter()
                    .filter(|c| c.kind() == "dimensions_expr")
                    .count()
                    + dimensions(child_of_kind(expr, "dimensions"), source);
                Ok((0..dims).fold(element, |ty, _| ResolvedType::Array(Box::new(ty))))
            }
            "array_access" => match self.type_of(child("array")?, source, ctx)? {
                ResolvedType::Array(element) => Ok(*element),
                _ => Err(unknown()),
            },
            "field_access" => self.field_access_type(expr, source, ctx),
            "method_invocation" => {
                let (decl, method, receiver) = self.resolve_invocation(expr, source, ctx)?;
                self.return_type(decl, method, receiver.as_ref())
            }
            "assignment_expression" => self.type_of(child("left")?, source, ctx),
            "ternary_expression" => self.type_of(child("consequence")?, source, ctx),
            "update_expression" => {
                let operand = named_children(expr).into_iter().next().ok_or_else(unknown)?;
                self.type_of(operand, source, ctx)
            }
            "unary_expression" => {
                if text(child("operator")?, source) == "!" {
                    Ok(ResolvedType::primitive("boolean"))
                } else {
                    self.type_of(child("operand")?, source, ctx)
                }
            }
            "binary_expression" => {
                let operator = text(child("operator")?, source);
                if matches!(operator, "==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||") {
                    return Ok(ResolvedType::primitive("boolean"));
                }
                let left = self.type_of(child("left")?, source, ctx)?;
                let right = self.type_of(child("right")?, source, ctx)?;
                let string = ResolvedType::reference("java.lang.String");
                if operator == "+" && (left == string || right == string) {
                    return Ok(string);
                }
                let promote = |ty: &ResolvedType| match ty {
                    ResolvedType::Primitive(p) => numeric_rank(p).map(|r| (r, p.clone())),
                    ResolvedType::Reference { qualified, .. } => {
                        unbox(qualified).and_then(|p| numeric_rank(p).map(|r| (r, p.to_string())))
                    }
                    _ => None,
                };
                match (promote(&left), promote(&right)) {
                    (Some(a), Some(b)) => {
                        let (rank, name) = if a.0 >= b.0 { a } else { b };
                        Ok(ResolvedType::Primitive(if rank < 3 { "int".into() } else { name }))
                    }
                    _ if left == ResolvedType::primitive("boolean") => Ok(left),
                    _ => Err(unknown()),
                }
            }
            _ => Err(unknown()),
        }
    }

    fn field_access_type(&self, expr: Node, source: &str, ctx: &TraversalContext) -> Result<ResolvedType, Unresolved> {
        let unknown = || Unresolved::new(text(expr, source), "field type unknown");
        let object = expr.child_by_field_name("object").ok_or_else(unknown)?;
        let field = text(expr.child_by_field_name("field").ok_or_else(unknown)?, source);

        let owner = match self.receiver(object, source, ctx)? {
            Receiver::Instance(ResolvedType::Array(_)) if field == "length" => {
                return Ok(ResolvedType::primitive("int"));
            }
            Receiver::Instance(ty) => ty.qualified_name().map(str::to_string).ok_or_else(unknown)?,
            Receiver::Static(owner) => owner,
        };
        let (decl, field) = self.find_field(&owner, field).ok_or_else(unknown)?;
        self.field_type(decl, field)
    }

    fn receiver(&self, object: Node, source: &str, ctx: &TraversalContext) -> Result<Receiver, Unresolved> {
        match object.kind() {
            "identifier" | "field_access" | "scoped_identifier" => match self.type_of(object, source, ctx) {
                Ok(ty) => Ok(Receiver::Instance(ty)),
                Err(err) => {
                    let name: String = text(object, source).split_whitespace().collect();
                    self.resolve_type_name(&name, ctx.scope())
                        .map(Receiver::Static)
                        .ok_or(err)
                }
            },
            "super" => ctx
                .current_class()
                .and_then(|class| self.superclass(class))
                .map(|parent| Receiver::Instance(ResolvedType::reference(parent)))
                .ok_or_else(|| Unresolved::new("super", "superclass unknown")),
            _ => self.type_of(object, source, ctx).map(Receiver::Instance),
        }
    }

    /// Qualified signature of the method a call expression binds to.
    pub fn resolve_call(&self, call: Node, source: &str, ctx: &TraversalContext) -> Result<String, Unresolved> {
        let (decl, method, _) = self.resolve_invocation(call, source, ctx)?;
        self.signature(&decl.fqn, method)
    }

    fn resolve_invocation(
        &self,
        call: Node,
        source: &str,
        ctx: &TraversalContext,
    ) -> Result<(&TypeDecl, &MethodDecl, Option<ResolvedType>), Unresolved> {
        let call_text = || text(call, source).to_string();
        let name = call
            .child_by_field_name("name")
            .map(|n| text(n, source))
            .ok_or_else(|| Unresolved::new(call_text(), "call without a name"))?;
        let args = call
            .child_by_field_name("arguments")
            .map(named_children)
            .unwrap_or_default();

        let (owners, receiver) = match call.child_by_field_name("object") {
            None => (ctx.classes().iter().rev().cloned().collect::<Vec<_>>(), None),
            Some(object) => match self.receiver(object, source, ctx)? {
                Receiver::Instance(ty @ ResolvedType::Reference { .. }) => {
                    let owner = ty.qualified_name().map(str::to_string).unwrap_or_default();
                    (vec![owner], Some(ty))
                }
                Receiver::Instance(ty) => {
                    return Err(Unresolved::new(
                        call_text(),
                        format!("receiver of type {} has no declared methods", ty.describe()),
                    ));
                }
                Receiver::Static(owner) => (vec![owner], None),
            },
        };

        for owner in &owners {
            let candidates = self.candidates(owner, name, args.len());
            if !candidates.is_empty() {
                let (decl, method) = self.select(candidates, &args, source, ctx, &call_text())?;
                return Ok((decl, method, receiver));
            }
        }
        let reason = if owners.iter().any(|owner| self.contains(owner)) {
            "no applicable method in the project".to_string()
        } else {
            format!("receiver type {} is outside the project", owners.join(", "))
        };
        Err(Unresolved::new(call_text(), reason))
    }

    /// Pick one overload by argument types.
    fn select<'i>(
        &'i self,
        candidates: Vec<(&'i TypeDecl, &'i MethodDecl)>,
        args: &[Node],
        source: &str,
        ctx: &TraversalContext,
        call_text: &str,
    ) -> Result<(&'i TypeDecl, &'i MethodDecl), Unresolved> {
        if let [only] = candidates.as_slice() {
            return Ok(*only);
        }
        let arg_types: Vec<Option<ResolvedType>> =
            args.iter().map(|arg| self.type_of(*arg, source, ctx).ok()).collect();

        let mut scored: Vec<(u32, (&TypeDecl, &MethodDecl))> = Vec::new();
        for (decl, method) in candidates {
            let fixed = if method.params.last().is_some_and(|p| p.varargs) {
                method.params.len() - 1
            } else {
                method.params.len()
            };
            let mut total = 0;
            let applicable = arg_types.iter().enumerate().all(|(i, arg)| {
                let Some(param) = method.params.get(i.min(method.params.len().saturating_sub(1))) else {
                    return false;
                };
                let param_ty = self.resolve_in_member(&decl.fqn, &param.ty, &method.type_params).ok();
                let score = if i >= fixed && matches!(arg, Some(ResolvedType::Array(_))) {
                    let array = param_ty.map(|ty| ResolvedType::Array(Box::new(ty)));
                    self.compatibility(arg.as_ref(), array.as_ref())
                } else {
                    self.compatibility(arg.as_ref(), param_ty.as_ref())
                };
                score.map(|s| total += s).is_some()
            });
            if applicable {
                // Fixed-arity matches beat varargs expansion.
                let bonus = u32::from(fixed == method.params.len());
                scored.push((total * 2 + bonus, (decl, method)));
            }
        }

        let best = scored.iter().map(|(score, _)| *score).max();
        let mut top = scored.into_iter().filter(|(score, _)| Some(*score) == best);
        match (top.next(), top.next()) {
            (Some((_, found)), None) => Ok(found),
            (None, _) => Err(Unresolved::new(call_text, "no overload accepts the argument types")),
            (Some(_), Some(_)) => Err(Unresolved::new(call_text, "ambiguous overload")),
        }
    }

    /// How well an argument type fits a parameter type; `None` if it cannot.
    /// Unknown types on either side fit weakly.
    fn compatibility(&self, arg: Option<&ResolvedType>, param: Option<&ResolvedType>) -> Option<u32> {
        let (Some(arg), Some(param)) = (arg, param) else {
            return Some(1);
        };
        if arg == param {
            return Some(3);
        }
        match (arg, param) {
            (_, ResolvedType::TypeVariable(_)) => Some(1),
            (ResolvedType::Null, ResolvedType::Primitive(_)) => None,
            (ResolvedType::Null, _) => Some(1),
            (ResolvedType::Primitive(a), ResolvedType::Primitive(b)) => widens(a, b).then_some(2),
            (ResolvedType::Primitive(a), ResolvedType::Reference { qualified, .. }) => {
                (boxed(a) == Some(qualified.as_str()) || qualified == OBJECT).then_some(1)
            }
            (ResolvedType::Reference { qualified, .. }, ResolvedType::Primitive(b)) => {
                unbox(qualified).is_some_and(|a| widens(a, b)).then_some(1)
            }
            (ResolvedType::Reference { qualified: a, .. }, ResolvedType::Reference { qualified: b, .. }) => {
                if a == b {
                    Some(2)
                } else if b == OBJECT {
                    Some(1)
                } else if self.contains(a) {
                    let hierarchy = self.hierarchy(a);
                    if hierarchy.contains(b) {
                        Some(1)
                    } else if hierarchy.iter().any(|ty| !self.contains(ty)) {
                        Some(0)
                    } else {
                        None
                    }
                } else {
                    Some(0)
                }
            }
            (ResolvedType::Array(a), ResolvedType::Array(b)) => self.compatibility(Some(&**a), Some(&**b)),
            (ResolvedType::Array(_), ResolvedType::Reference { qualified, .. }) => (qualified == OBJECT).then_some(1),
            _ => None,
        }
    }

    fn return_type(
        &self,
        decl: &TypeDecl,
        method: &MethodDecl,
        receiver: Option<&ResolvedType>,
    ) -> Result<ResolvedType, Unresolved> {
        let syntax = method
            .return_type
            .as_ref()
            .ok_or_else(|| Unresolved::new(&method.name, "no return type"))?;
        let ty = self.resolve_in_member(&decl.fqn, syntax, &method.type_params)?;
        Ok(match receiver {
            Some(ResolvedType::Reference { qualified, args })
                if *qualified == decl.fqn && args.len() == decl.type_params.len() && !args.is_empty() =>
            {
                ty.substitute(&decl.type_params, args)
            }
            _ => ty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser_pool::{ParseRequest, ParserPool};
    use std::path::{Path, PathBuf};

    fn index(files: &[(&str, &str)]) -> ProjectIndex {
        let pool = ParserPool::new(2);
        let parsed: Vec<_> = files
            .iter()
            .map(|(path, content)| {
                pool.parse_blocking(ParseRequest {
                    content: content.to_string(),
                    path: PathBuf::from(path),
                })
                .unwrap()
            })
            .collect();
        ProjectIndex::build(&parsed)
    }

    fn fixture() -> ProjectIndex {
        index(&[
            (
                "/p/app/Config.java",
                "package app; import java.util.*; public class Config<T> { Map<String, T> values; List<T> items; static class Entry {} }",
            ),
            (
                "/p/app/Loader.java",
                "package app; import app.io.Reader; public class Loader extends Base { Config.Entry entry; void load(String path, int... flags) {} }",
            ),
            ("/p/app/Base.java", "package app; public abstract class Base { protected Reader reader; }"),
            ("/p/app/io/Reader.java", "package app.io; public interface Reader { String read(); }"),
        ])
    }

    fn scope_of<'a>(index: &'a ProjectIndex, path: &str, enclosing: &'a [String]) -> TypeScope<'a> {
        TypeScope {
            file: index.file_scope(Path::new(path)).unwrap(),
            enclosing,
            type_vars: &[],
        }
    }

    #[test]
    fn simple_names_resolve_through_scope_layers() {
        let index = fixture();
        let enclosing = ["app.Loader".to_string()];
        let scope = scope_of(&index, "/p/app/Loader.java", &enclosing);

        assert_eq!(index.resolve_type_name("Reader", scope).as_deref(), Some("app.io.Reader"));
        assert_eq!(index.resolve_type_name("Base", scope).as_deref(), Some("app.Base"));
        assert_eq!(index.resolve_type_name("String", scope).as_deref(), Some("java.lang.String"));
        assert_eq!(index.resolve_type_name("Config.Entry", scope).as_deref(), Some("app.Config.Entry"));
        assert_eq!(index.resolve_type_name("java.util.Map", scope).as_deref(), Some("java.util.Map"));
        assert_eq!(index.resolve_type_name("Unknown", scope), None);

        let config_scope = scope_of(&index, "/p/app/Config.java", &[]);
        assert_eq!(index.resolve_type_name("Map", config_scope).as_deref(), Some("java.util.Map"));
    }

    #[test]
    fn signatures_use_described_parameter_types() {
        let index = fixture();
        let loader = index.get("app.Loader").unwrap();
        let load = loader.methods.iter().find(|m| m.name == "load").unwrap();
        assert_eq!(
            index.signature("app.Loader", load).unwrap(),
            "app.Loader.load(java.lang.String, int...)"
        );
    }

    #[test]
    fn generic_field_types_describe_with_arguments() {
        let index = fixture();
        let (decl, field) = index.find_field("app.Config", "values").unwrap();
        let ty = index.field_type(decl, field).unwrap();
        assert_eq!(ty.describe(), "java.util.Map<java.lang.String, T>");
    }

    #[test]
    fn inherited_fields_are_found_through_the_hierarchy() {
        let index = fixture();
        assert_eq!(index.hierarchy("app.Loader"), vec!["app.Loader", "app.Base"]);
        let (decl, _) = index.find_field("app.Loader", "reader").unwrap();
        assert_eq!(decl.fqn, "app.Base");
    }

    #[test]
    fn element_type_unwraps_arrays_and_single_argument_generics() {
        let list = ResolvedType::Reference {
            qualified: "java.util.List".into(),
            args: vec![ResolvedType::reference("app.Item")],
        };
        assert_eq!(list.element_type(), Some(ResolvedType::reference("app.Item")));
        let array = ResolvedType::Array(Box::new(ResolvedType::Primitive("int".into())));
        assert_eq!(array.element_type(), Some(ResolvedType::Primitive("int".into())));
    }

    #[test]
    fn primitive_widening_follows_language_rules() {
        assert!(widens("int", "long"));
        assert!(widens("char", "int"));
        assert!(!widens("long", "int"));
        assert!(!widens("char", "short"));
        assert!(!widens("byte", "char"));
    }
}
