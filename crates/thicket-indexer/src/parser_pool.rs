//! Thread-safe parser pool for tree-sitter-java
//!
//! Tree-sitter parsers are not Sync, so each worker thread owns one parser and
//! requests arrive over a channel. Callers on any thread (including rayon
//! workers) block on a per-request reply channel.

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};

use tree_sitter::Parser;

use crate::error::IndexError;

/// A parsing request sent to the parser pool
#[derive(Debug)]
pub struct ParseRequest {
    pub content: String,
    pub path: PathBuf,
}

/// A parsed compilation unit with the source it was parsed from
#[derive(Debug)]
pub struct ParseResult {
    pub tree: tree_sitter::Tree,
    pub path: PathBuf,
    pub content: String,
}

/// Internal message for the parser worker
struct WorkerRequest {
    request: ParseRequest,
    response_sender: Sender<Result<ParseResult, IndexError>>,
}

/// Thread-safe parser pool
#[derive(Clone)]
pub struct ParserPool {
    sender: Sender<WorkerRequest>,
}

impl ParserPool {
    /// Create a new parser pool with the specified number of worker threads
    pub fn new(num_workers: usize) -> Self {
        let (sender, receiver) = channel::<WorkerRequest>();
        let receiver = Arc::new(Mutex::new(receiver));

        for i in 0..num_workers.max(1) {
            let receiver = receiver.clone();
            std::thread::spawn(move || {
                Self::worker_thread(i, receiver);
            });
        }

        Self { sender }
    }

    fn worker_thread(worker_id: usize, receiver: Arc<Mutex<Receiver<WorkerRequest>>>) {
        tracing::debug!("Parser worker {} started", worker_id);

        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&tree_sitter_java::LANGUAGE.into()) {
            tracing::error!("Parser worker {} cannot load the Java grammar: {}", worker_id, e);
            return;
        }

        loop {
            let next = match receiver.lock() {
                Ok(guard) => guard.recv(),
                Err(_) => break,
            };
            let Ok(WorkerRequest { request, response_sender }) = next else {
                tracing::debug!("Parser worker {} shutting down", worker_id);
                break;
            };

            let result = match parser.parse(&request.content, None) {
                Some(tree) => Ok(ParseResult {
                    tree,
                    path: request.path,
                    content: request.content,
                }),
                None => Err(IndexError::Parse(request.path)),
            };

            if response_sender.send(result).is_err() {
                tracing::warn!("Failed to send parse result back to caller");
            }
        }
    }

    /// Parse content, blocking the current thread until a worker replies
    pub fn parse_blocking(&self, request: ParseRequest) -> Result<ParseResult, IndexError> {
        let (response_sender, response_receiver) = channel();

        self.sender
            .send(WorkerRequest {
                request,
                response_sender,
            })
            .map_err(|_| IndexError::Pool("parser pool is shut down".into()))?;

        response_receiver
            .recv()
            .map_err(|_| IndexError::Pool("parser worker died".into()))?
    }

    /// Read a file from disk and parse it
    pub fn parse_file(&self, path: PathBuf) -> Result<ParseResult, IndexError> {
        let content = std::fs::read_to_string(&path).map_err(|source| IndexError::Io {
            path: path.clone(),
            source,
        })?;
        self.parse_blocking(ParseRequest { content, path })
    }
}

/// Convenience function to create a parser pool with default settings
pub fn create_parser_pool() -> ParserPool {
    // Use number of CPU cores as default worker count, but at least 2
    let num_workers = std::thread::available_parallelism()
        .map(|n| n.get().max(2))
        .unwrap_or(2);

    ParserPool::new(num_workers)
}
