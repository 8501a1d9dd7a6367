//! Configuration loaded from `thicket.toml` with environment overrides

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of the configuration file looked up at the project root.
pub const CONFIG_FILE: &str = "thicket.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThicketConfig {
    pub embeddings: EmbeddingsConfig,
    pub llm: LlmConfig,
    pub indexer: IndexerConfig,
    pub retrieval: RetrievalConfig,
    pub store: StoreConfig,
}

/// Embedding endpoint shared by ingestion and query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    /// `huggingface`, `openai` or `local`.
    pub provider: String,
    pub url: Option<String>,
    pub token: Option<String>,
    pub model: Option<String>,
    pub dim: usize,
    /// Inputs are cut to this many tokens when the endpoint rejects them as too long.
    pub tokens_per_embedding: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: "huggingface".to_string(),
            url: None,
            token: None,
            model: None,
            dim: 384,
            tokens_per_embedding: 256,
            batch_size: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub url: Option<String>,
    pub tokens_per_request: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            url: None,
            tokens_per_request: 8000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Qualified-name prefixes treated as platform types: fields of these types stay
    /// opaque and references to them produce no USES_CLASS relationship.
    pub excluded_namespaces: Vec<String>,
    /// Additional glob patterns to skip while walking (beyond .gitignore).
    pub exclude: Vec<String>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            excluded_namespaces: vec!["java.".to_string(), "javax.".to_string()],
            exclude: Vec::new(),
        }
    }
}

/// Which relationships a hydrated cluster carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipPolicy {
    /// None: clusters list nodes only.
    #[default]
    Omitted,
    /// The edges the relationship-collecting patterns walked to reach new nodes.
    /// Edges between two already reached nodes are not included.
    Traversed,
    /// Every relationship whose endpoints both lie in the cluster.
    Induced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_n: usize,
    pub index_name: String,
    pub relationships: RelationshipPolicy,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            index_name: "methodEmbeddings".to_string(),
            relationships: RelationshipPolicy::Omitted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Snapshot location, relative to the project root unless absolute.
    pub snapshot: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot: crate::snapshot::snapshot_path(Path::new("")),
        }
    }
}

impl ThicketConfig {
    /// Load configuration from `thicket.toml` in the given root directory, then apply
    /// environment overrides (a `.env` file is honoured).
    ///
    /// Returns defaults if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);
        let mut config = if !config_path.exists() {
            Self::default()
        } else {
            match std::fs::read_to_string(&config_path) {
                Ok(contents) => Self::from_toml(&contents).unwrap_or_else(|err| {
                    tracing::warn!("Failed to parse {}: {err}. Using defaults.", config_path.display());
                    Self::default()
                }),
                Err(err) => {
                    tracing::warn!("Failed to read {}: {err}. Using defaults.", config_path.display());
                    Self::default()
                }
            }
        };

        if let Err(err) = dotenvy::from_path(root.join(".env")) {
            if !err.not_found() {
                tracing::warn!("Failed to load .env: {err}");
            }
        }
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Apply overrides from a variable lookup.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("THICKET_EMBEDDINGS_URL") {
            self.embeddings.url = Some(url);
        }
        if let Some(token) = var("THICKET_EMBEDDINGS_TOKEN") {
            self.embeddings.token = Some(token);
        }
        if let Some(dim) = var("THICKET_EMBEDDINGS_DIM") {
            match dim.parse() {
                Ok(dim) => self.embeddings.dim = dim,
                Err(_) => tracing::warn!("Ignoring non-numeric THICKET_EMBEDDINGS_DIM={dim}"),
            }
        }
        if let Some(model) = var("THICKET_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(key) = var("OPENAI_API_KEY") {
            self.llm.api_key.get_or_insert(key);
        }
    }

    /// Snapshot path resolved against the project root.
    pub fn snapshot_path(&self, root: &Path) -> PathBuf {
        if self.store.snapshot.is_absolute() {
            self.store.snapshot.clone()
        } else {
            root.join(&self.store.snapshot)
        }
    }
}
