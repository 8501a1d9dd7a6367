//! Shared state for extracting the files of one project root

use std::sync::Arc;

use thicket_core::GraphWriter;

use crate::config::NamespaceFilter;
use crate::extractor::FileReport;
use crate::languages::get_extractor;
use crate::parser_pool::ParseResult;
use crate::symbols::ProjectIndex;

/// Everything an extractor needs besides the file itself: the read-only symbol
/// table, the graph writer and the platform namespace filter.
#[derive(Debug, Clone)]
pub struct ExtractionSession {
    index: Arc<ProjectIndex>,
    writer: Arc<GraphWriter>,
    namespaces: NamespaceFilter,
}

impl ExtractionSession {
    pub fn new(index: Arc<ProjectIndex>, writer: Arc<GraphWriter>, namespaces: NamespaceFilter) -> Self {
        Self {
            index,
            writer,
            namespaces,
        }
    }

    pub fn index(&self) -> &ProjectIndex {
        &self.index
    }

    pub fn writer(&self) -> &GraphWriter {
        &self.writer
    }

    pub fn namespaces(&self) -> &NamespaceFilter {
        &self.namespaces
    }

    /// Write the file node under its directory and extract its contents.
    /// Returns `None` for files no extractor handles.
    pub fn process_file(&self, parsed: &ParseResult) -> Option<FileReport> {
        let extractor = get_extractor(&parsed.path)?;
        let file = parsed.path.display().to_string();
        match parsed.path.parent() {
            Some(directory) => self.writer.directory_to_file(&directory.display().to_string(), &file),
            None => self.writer.insert_file(&file),
        };

        let report = extractor.extract(self, &parsed.path, &parsed.tree, &parsed.content);
        tracing::debug!(
            file = %file,
            classes = report.classes,
            methods = report.methods,
            calls = report.calls,
            unresolved = report.unresolved.len(),
            "Extracted file"
        );
        Some(report)
    }
}
