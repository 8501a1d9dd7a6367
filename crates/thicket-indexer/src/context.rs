//! Traversal context: the stack of enclosing declarations and scoped locals

use crate::resolver::{ResolvedType, TypeScope};
use crate::symbols::FileScope;

/// The method or constructor whose body is being walked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    pub signature: String,
    pub constructor: bool,
}

#[derive(Debug)]
enum FrameKind {
    Class,
    Executable(Executable),
    Block,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    classes: usize,
    type_vars: usize,
    locals: usize,
}

#[derive(Debug, Clone)]
struct Local {
    name: String,
    ty: Option<ResolvedType>,
}

/// Explicit replacement for "current class / current executable" visitor state.
/// Each `enter_*` must be paired with one `exit`.
#[derive(Debug)]
pub struct TraversalContext {
    file: FileScope,
    frames: Vec<Frame>,
    classes: Vec<String>,
    type_vars: Vec<String>,
    locals: Vec<Local>,
}

impl TraversalContext {
    pub fn new(file: FileScope) -> Self {
        Self {
            file,
            frames: Vec::new(),
            classes: Vec::new(),
            type_vars: Vec::new(),
            locals: Vec::new(),
        }
    }

    fn push(&mut self, kind: FrameKind) {
        self.frames.push(Frame {
            kind,
            classes: self.classes.len(),
            type_vars: self.type_vars.len(),
            locals: self.locals.len(),
        });
    }

    pub fn enter_class(&mut self, fqn: String, type_params: &[String]) {
        self.push(FrameKind::Class);
        self.classes.push(fqn);
        self.type_vars.extend(type_params.iter().cloned());
    }

    pub fn enter_executable(&mut self, signature: String, constructor: bool, type_params: &[String]) {
        self.push(FrameKind::Executable(Executable { signature, constructor }));
        self.type_vars.extend(type_params.iter().cloned());
    }

    pub fn enter_block(&mut self) {
        self.push(FrameKind::Block);
    }

    pub fn exit(&mut self) {
        if let Some(frame) = self.frames.pop() {
            self.classes.truncate(frame.classes);
            self.type_vars.truncate(frame.type_vars);
            self.locals.truncate(frame.locals);
        }
    }

    pub fn file(&self) -> &FileScope {
        &self.file
    }

    /// Innermost enclosing class, qualified.
    pub fn current_class(&self) -> Option<&str> {
        self.classes.last().map(String::as_str)
    }

    /// Enclosing classes, outermost first.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Innermost enclosing method or constructor.
    pub fn current_executable(&self) -> Option<&Executable> {
        self.frames.iter().rev().find_map(|frame| match &frame.kind {
            FrameKind::Executable(exec) => Some(exec),
            _ => None,
        })
    }

    pub fn declare(&mut self, name: impl Into<String>, ty: Option<ResolvedType>) {
        self.locals.push(Local { name: name.into(), ty });
    }

    /// Look up a local or parameter. `Some(None)` means declared with an unknown type.
    pub fn local(&self, name: &str) -> Option<Option<&ResolvedType>> {
        self.locals
            .iter()
            .rev()
            .find(|local| local.name == name)
            .map(|local| local.ty.as_ref())
    }

    pub fn scope(&self) -> TypeScope<'_> {
        TypeScope {
            file: &self.file,
            enclosing: &self.classes,
            type_vars: &self.type_vars,
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}
