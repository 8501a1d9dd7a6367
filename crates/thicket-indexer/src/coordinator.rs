//! Orchestrates indexing of a project root

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use thicket_core::{GraphStore, GraphWriter, IndexerConfig, WriteStats};

use crate::config::NamespaceFilter;
use crate::error::IndexError;
use crate::extractor::FileReport;
use crate::parser_pool::{ParseResult, ParserPool, create_parser_pool};
use crate::session::ExtractionSession;
use crate::symbols::ProjectIndex;
use crate::walker::SourceWalker;

/// Summary of one indexing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub root: PathBuf,
    pub directories: usize,
    pub files: usize,
    pub parse_failures: Vec<PathBuf>,
    pub types: usize,
    pub classes: usize,
    pub methods: usize,
    pub fields: usize,
    pub calls: usize,
    pub uses: usize,
    pub unresolved: usize,
    pub writes: WriteStats,
}

impl IndexReport {
    fn absorb(&mut self, file: FileReport) {
        self.files += 1;
        self.classes += file.classes;
        self.methods += file.methods;
        self.fields += file.fields;
        self.calls += file.calls;
        self.uses += file.uses;
        self.unresolved += file.unresolved.len();
    }
}

/// Walk, parse, build the symbol table, then extract every file into the store.
pub struct Coordinator {
    store: Arc<dyn GraphStore>,
    config: IndexerConfig,
    pool: ParserPool,
}

impl Coordinator {
    pub fn new(store: Arc<dyn GraphStore>, config: IndexerConfig) -> Self {
        Self::with_pool(store, config, create_parser_pool())
    }

    pub fn with_pool(store: Arc<dyn GraphStore>, config: IndexerConfig, pool: ParserPool) -> Self {
        Self { store, config, pool }
    }

    pub fn index_project(&self, root: &Path) -> Result<IndexReport, IndexError> {
        let root = root.canonicalize().map_err(|source| IndexError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        self.store.probe()?;
        tracing::info!("Indexing {}", root.display());

        let walk = SourceWalker::new(&root, &self.config.exclude)?.walk();
        let writer = Arc::new(GraphWriter::new(self.store.clone()));
        let mut report = IndexReport {
            root: root.clone(),
            directories: walk.directories.len(),
            ..IndexReport::default()
        };

        for directory in &walk.directories {
            let path = directory.display().to_string();
            match directory.parent() {
                Some(parent) if *directory != root && parent.starts_with(&root) => {
                    writer.directory_to_directory(&parent.display().to_string(), &path)
                }
                _ => writer.insert_directory(&path),
            };
        }

        let results: Vec<Result<ParseResult, IndexError>> = walk
            .files
            .par_iter()
            .map(|path| self.pool.parse_file(path.clone()))
            .collect();
        let mut parsed = Vec::with_capacity(results.len());
        for (path, result) in walk.files.iter().zip(results) {
            match result {
                Ok(file) => {
                    if file.tree.root_node().has_error() {
                        tracing::debug!("{} has syntax errors; extracting what parsed", path.display());
                    }
                    parsed.push(file);
                }
                Err(err) => {
                    tracing::warn!("Skipping {}: {err}", path.display());
                    report.parse_failures.push(path.clone());
                }
            }
        }

        let index = Arc::new(ProjectIndex::build(&parsed));
        report.types = index.type_count();
        let session = ExtractionSession::new(index, writer.clone(), NamespaceFilter::from_config(&self.config));
        for file in &parsed {
            if let Some(file_report) = session.process_file(file) {
                report.absorb(file_report);
            }
        }
        report.writes = writer.stats();

        tracing::info!(
            "Indexed {}: {} files, {} classes, {} methods, {} calls, {} unresolved, {} failed writes",
            root.display(),
            report.files,
            report.classes,
            report.methods,
            report.calls,
            report.unresolved,
            report.writes.failed
        );
        Ok(report)
    }
}
