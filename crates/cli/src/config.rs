use anyhow::{bail, Context as AnyhowContext, Result};
use chunkit_chunker::ChunkerConfig;
use chunkit_indexer::IngestConfig;
use chunkit_search::{Bm25Config, Persona, RetrievalConfig};
use chunkit_vector_store::{DEFAULT_COLLECTION, DEFAULT_INDEX_DIR};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "chunkit.toml";

pub const DEFAULT_DIMENSION: usize = 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    /// OpenAI-compatible `/embeddings` endpoint
    #[default]
    Http,
    /// Deterministic offline vectors
    Stub,
}

impl EmbeddingMode {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "stub" => Ok(Self::Stub),
            other => bail!("unknown embedding mode '{other}' (expected http or stub)"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RerankMode {
    /// HTTP reranker when a URL is configured, vector order otherwise
    #[default]
    Auto,
    Http,
    Bm25,
    Off,
}

impl RerankMode {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "http" => Ok(Self::Http),
            "bm25" => Ok(Self::Bm25),
            "off" | "none" => Ok(Self::Off),
            other => bail!("unknown rerank mode '{other}' (expected auto, http, bm25 or off)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub mode: EmbeddingMode,
    /// Base URL; `/embeddings` is appended
    pub url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Texts per request
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::Http,
            url: "http://127.0.0.1:8080/v1".to_string(),
            model: "bge-large-zh-v1.5".to_string(),
            timeout_secs: 30,
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankSettings {
    pub mode: RerankMode,
    /// Base URL; `/rerank` is appended
    pub url: Option<String>,
    pub model: Option<String>,
    pub bm25: Bm25Config,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub index_dir: PathBuf,
    pub collection: String,
    pub dimension: usize,
    /// HuggingFace `tokenizer.json` used to measure chunk length
    pub tokenizer: Option<PathBuf>,
    pub api_key: Option<String>,
    pub persona: Persona,
    pub chunker: ChunkerConfig,
    pub ingest: IngestConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingSettings,
    pub rerank: RerankSettings,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from(DEFAULT_INDEX_DIR),
            collection: DEFAULT_COLLECTION.to_string(),
            dimension: DEFAULT_DIMENSION,
            tokenizer: None,
            api_key: None,
            persona: Persona::General,
            chunker: ChunkerConfig::default(),
            ingest: IngestConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingSettings::default(),
            rerank: RerankSettings::default(),
        }
    }
}

impl RagConfig {
    /// File (explicit path, else `chunkit.toml` if present), then `CHUNKIT_*`
    /// environment variables.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(dir) = get("CHUNKIT_INDEX_DIR") {
            self.index_dir = PathBuf::from(dir);
        }
        if let Some(collection) = get("CHUNKIT_COLLECTION") {
            self.collection = collection;
        }
        if let Some(dimension) = get("CHUNKIT_DIMENSION") {
            self.dimension = dimension
                .trim()
                .parse()
                .with_context(|| format!("CHUNKIT_DIMENSION must be a number, got '{dimension}'"))?;
        }
        if let Some(mode) = get("CHUNKIT_EMBEDDING_MODE") {
            self.embedding.mode = EmbeddingMode::parse(&mode)?;
        }
        if let Some(url) = get("CHUNKIT_EMBEDDING_URL") {
            self.embedding.url = url;
        }
        if let Some(model) = get("CHUNKIT_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(mode) = get("CHUNKIT_RERANK_MODE") {
            self.rerank.mode = RerankMode::parse(&mode)?;
        }
        if let Some(url) = get("CHUNKIT_RERANK_URL") {
            self.rerank.url = Some(url);
        }
        if let Some(key) = get("CHUNKIT_API_KEY") {
            self.api_key = Some(key);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            bail!("dimension must be positive");
        }
        if self.collection.trim().is_empty() {
            bail!("collection name must not be empty");
        }
        self.chunker.validate()?;
        if self.rerank.mode == RerankMode::Http && self.rerank.url.is_none() {
            bail!("rerank mode 'http' needs rerank.url or CHUNKIT_RERANK_URL");
        }
        Ok(())
    }
}
