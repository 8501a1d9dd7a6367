//! Indexing errors

use std::path::PathBuf;

use thicket_core::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {0}")]
    Parse(PathBuf),

    #[error("invalid exclude pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("parser pool unavailable: {0}")]
    Pool(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A type, name or call reference the resolver could not map to a qualified name.
/// Expected during extraction; the offending node or edge is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot resolve `{symbol}`: {reason}")]
pub struct Unresolved {
    pub symbol: String,
    pub reason: String,
}

impl Unresolved {
    pub fn new(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }
}
