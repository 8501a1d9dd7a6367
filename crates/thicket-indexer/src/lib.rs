//! Java source parsing, symbol resolution and graph extraction

pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod extractor;
pub mod languages;
pub mod parser_pool;
pub mod resolver;
pub mod session;
pub mod symbols;
pub mod syntax;
pub mod walker;


#[cfg(test)]
pub mod test_utils;

pub use config::NamespaceFilter;
pub use coordinator::{Coordinator, IndexReport};
pub use error::{IndexError, Unresolved};
pub use extractor::{Diagnostic, FileReport, LanguageExtractor};
pub use languages::java::JavaExtractor;
pub use parser_pool::{ParseRequest, ParseResult, ParserPool, create_parser_pool};
pub use resolver::{ResolvedType, TypeScope};
pub use session::ExtractionSession;
pub use symbols::{ProjectIndex, TypeDecl, TypeKind};
pub use walker::{SourceWalk, SourceWalker};
