//! Indexer settings derived from `[indexer]` in thicket.toml

use thicket_core::IndexerConfig;

/// Qualified-name prefixes of platform types.
///
/// Fields of these types are written as opaque attributed fields and name
/// references to them produce no USES_CLASS relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceFilter {
    prefixes: Vec<String>,
}

impl NamespaceFilter {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    pub fn from_config(config: &IndexerConfig) -> Self {
        Self::new(config.excluded_namespaces.clone())
    }

    pub fn is_excluded(&self, qualified_name: &str) -> bool {
        self.prefixes.iter().any(|prefix| qualified_name.starts_with(prefix.as_str()))
    }
}

impl Default for NamespaceFilter {
    fn default() -> Self {
        Self::from_config(&IndexerConfig::default())
    }
}
