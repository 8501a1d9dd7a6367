//! Language extractors

pub mod java;

use std::path::Path;

use crate::extractor::LanguageExtractor;

/// Get the extractor for a file based on its extension
pub fn get_extractor(path: &Path) -> Option<Box<dyn LanguageExtractor>> {
    match path.extension()?.to_str()? {
        "java" => Some(Box::new(java::JavaExtractor)),
        _ => None,
    }
}
