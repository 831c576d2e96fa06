use crate::config::{EmbeddingMode, RagConfig, RerankMode};
use crate::providers::{HttpEmbedder, HttpReranker};
use anyhow::{Context as AnyhowContext, Result};
use chunkit_chunker::{Chunker, TokenizerCounter};
use chunkit_indexer::{acquire_index_write_lock, ImageAssetMap, IngestionPipeline};
use chunkit_search::{Bm25Reranker, Reranker, RetrievalPipeline};
use chunkit_vector_store::{
    Embedder, SharedStore, StorePaths, StoreStats, StubEmbedder, VectorStore,
};
use std::sync::Arc;
use std::time::Duration;

/// Everything a command needs, built once at startup and never mutated.
pub struct RagContext {
    config: RagConfig,
    store: SharedStore,
    embedder: Arc<dyn Embedder>,
    reranker: Option<Arc<dyn Reranker>>,
    chunker: Arc<Chunker>,
}

impl RagContext {
    pub fn init(config: RagConfig) -> Result<Self> {
        let chunker = match &config.tokenizer {
            Some(path) => Chunker::with_length_function(
                config.chunker.clone(),
                Arc::new(TokenizerCounter::from_file(path)?),
            )?,
            None => Chunker::new(config.chunker.clone())?,
        };

        let embedder = build_embedder(&config)?;
        let reranker = build_reranker(&config)?;

        let paths = StorePaths::new(&config.index_dir, &config.collection);
        let store = VectorStore::open(paths, config.dimension).with_context(|| {
            format!(
                "Failed to open collection '{}' in {}",
                config.collection,
                config.index_dir.display()
            )
        })?;
        log::debug!(
            "Opened collection '{}' with {} live chunks",
            config.collection,
            store.count()
        );

        Ok(Self {
            config,
            store: store.into_shared(),
            embedder,
            reranker,
            chunker: Arc::new(chunker),
        })
    }

    pub const fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn ingestion(&self) -> IngestionPipeline {
        IngestionPipeline::new(
            self.store.clone(),
            self.embedder.clone(),
            self.chunker.clone(),
            self.config.ingest.clone(),
        )
    }

    pub fn retrieval(&self) -> RetrievalPipeline {
        RetrievalPipeline::new(
            self.store.clone(),
            self.embedder.clone(),
            self.config.retrieval.clone(),
        )
        .with_reranker(self.reranker.clone())
    }

    pub async fn stats(&self) -> StoreStats {
        self.store.read().await.stats()
    }

    /// Empty the collection and the image asset map
    pub async fn clear(&self) -> Result<()> {
        let lock_path = self.store.read().await.paths().lock_file();
        let _lock = acquire_index_write_lock(lock_path).await?;

        self.store.write().await.clear()?;
        ImageAssetMap::new().save(&self.config.ingest.image_mapping_file)?;
        log::info!("Cleared collection '{}'", self.config.collection);
        Ok(())
    }
}

fn build_embedder(config: &RagConfig) -> Result<Arc<dyn Embedder>> {
    let settings = &config.embedding;
    match settings.mode {
        EmbeddingMode::Stub => {
            log::debug!("Using stub embeddings ({} dims)", config.dimension);
            Ok(Arc::new(StubEmbedder::new(config.dimension)))
        }
        EmbeddingMode::Http => {
            let embedder = HttpEmbedder::new(
                &settings.url,
                settings.model.clone(),
                config.api_key.clone(),
                config.dimension,
                Duration::from_secs(settings.timeout_secs),
            )?
            .with_batch_size(settings.batch_size);
            Ok(Arc::new(embedder))
        }
    }
}

fn build_reranker(config: &RagConfig) -> Result<Option<Arc<dyn Reranker>>> {
    let settings = &config.rerank;
    let http = |url: &str| -> Result<Option<Arc<dyn Reranker>>> {
        let reranker = HttpReranker::new(
            url,
            settings.model.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.embedding.timeout_secs),
        )?;
        Ok(Some(Arc::new(reranker)))
    };
    let bm25 = || -> Option<Arc<dyn Reranker>> {
        Some(Arc::new(Bm25Reranker::new(settings.bm25.clone())))
    };

    match (settings.mode, settings.url.as_deref()) {
        (RerankMode::Off, _) | (RerankMode::Auto, None) => Ok(None),
        (RerankMode::Bm25, _) => Ok(bm25()),
        (RerankMode::Http | RerankMode::Auto, Some(url)) => http(url),
        (RerankMode::Http, None) => {
            anyhow::bail!("rerank mode 'http' needs rerank.url or CHUNKIT_RERANK_URL")
        }
    }
}
