//! Language extractor trait definition

use std::path::{Path, PathBuf};

use serde::Serialize;
use tree_sitter::Tree;

use crate::session::ExtractionSession;

/// A symbol that could not be resolved while extracting a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub line: u32,
    pub message: String,
}

/// What one file contributed to the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub classes: usize,
    pub methods: usize,
    pub fields: usize,
    pub calls: usize,
    pub uses: usize,
    pub unresolved: Vec<Diagnostic>,
}

pub trait LanguageExtractor: Send + Sync {
    /// Map one parsed compilation unit onto graph writes.
    ///
    /// Never fails as a whole: unresolved symbols are logged, recorded in the
    /// report and skipped.
    fn extract(&self, session: &ExtractionSession, path: &Path, tree: &Tree, source: &str) -> FileReport;
}
