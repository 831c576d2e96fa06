use crate::classify::classify;
use crate::error::{Result, SearchError};
use crate::rerank::Reranker;
use crate::result::RetrievedItem;
use chunkit_indexer::{ImageAssetMap, DEFAULT_IMAGE_MAPPING_FILE};
use chunkit_vector_store::{ChunkOrigin, Embedder, SearchHit, SharedStore};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Retrieval settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidates fetched per requested result before reranking
    pub overfetch_factor: usize,
    /// Upper bound on fetched candidates
    pub overfetch_cap: usize,
    pub image_mapping_file: PathBuf,
    /// Base for relative image paths; the working directory when unset
    pub asset_root: Option<PathBuf>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            overfetch_factor: 3,
            overfetch_cap: 50,
            image_mapping_file: PathBuf::from(DEFAULT_IMAGE_MAPPING_FILE),
            asset_root: None,
        }
    }
}

impl RetrievalConfig {
    /// Candidates to fetch for `top_k` results; never fewer than `top_k`
    #[must_use]
    pub fn initial_k(&self, top_k: usize) -> usize {
        top_k
            .saturating_mul(self.overfetch_factor.max(1))
            .min(self.overfetch_cap)
            .max(top_k)
    }
}

/// Query → embed → over-fetch → rerank → classify
#[derive(Clone)]
pub struct RetrievalPipeline {
    store: SharedStore,
    embedder: Arc<dyn Embedder>,
    reranker: Option<Arc<dyn Reranker>>,
    config: RetrievalConfig,
}

impl RetrievalPipeline {
    pub fn new(store: SharedStore, embedder: Arc<dyn Embedder>, config: RetrievalConfig) -> Self {
        Self {
            store,
            embedder,
            reranker: None,
            config,
        }
    }

    #[must_use]
    pub fn with_reranker(mut self, reranker: Option<Arc<dyn Reranker>>) -> Self {
        self.reranker = reranker;
        self
    }

    pub const fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn has_reranker(&self) -> bool {
        self.reranker.is_some()
    }

    /// Up to `top_k` typed results, most relevant first.
    ///
    /// A failing reranker degrades to vector order; embedding or store
    /// failures are returned.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedItem>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let hits = self.candidates(query, top_k).await?;
        if hits.is_empty() {
            log::info!("No candidates for query");
            return Ok(Vec::new());
        }

        let hits = self.rerank(query, hits, top_k).await;
        Ok(self.format(&hits))
    }

    /// Nearest chunks by vector distance, over-fetched for reranking
    pub async fn candidates(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let vector = self.embedder.embed_query(query).await?;
        let initial_k = self.config.initial_k(top_k);
        let store = self.store.read().await;
        let hits = store.search(&vector, initial_k)?;
        log::debug!(
            "Vector search returned {} of {initial_k} requested candidates",
            hits.len()
        );
        Ok(hits)
    }

    async fn rerank(&self, query: &str, mut hits: Vec<SearchHit>, top_k: usize) -> Vec<SearchHit> {
        let reranker = match &self.reranker {
            Some(reranker) if hits.len() > top_k => reranker,
            _ => {
                hits.truncate(top_k);
                return hits;
            }
        };

        let contents: Vec<String> = hits.iter().map(|hit| hit.record.content.clone()).collect();
        match reranker.score(query, &contents).await {
            Ok(scores) if scores.len() == hits.len() => {
                let mut scored: Vec<(f32, SearchHit)> = scores.into_iter().zip(hits).collect();
                // stable: ties keep vector order
                scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
                scored.into_iter().take(top_k).map(|(_, hit)| hit).collect()
            }
            Ok(scores) => {
                log::warn!(
                    "Reranker returned {} scores for {} candidates; keeping vector order",
                    scores.len(),
                    hits.len()
                );
                hits.truncate(top_k);
                hits
            }
            Err(err) => {
                log::warn!("Rerank failed, keeping vector order: {err}");
                hits.truncate(top_k);
                hits
            }
        }
    }

    fn format(&self, hits: &[SearchHit]) -> Vec<RetrievedItem> {
        let has_images = hits
            .iter()
            .any(|hit| hit.record.origin() == ChunkOrigin::ImageDescription);
        let assets = if has_images {
            ImageAssetMap::load(&self.config.image_mapping_file)
        } else {
            ImageAssetMap::new()
        };
        let root = self.asset_root();

        hits.iter()
            .map(|hit| classify(&hit.record, &assets, &root))
            .collect()
    }

    fn asset_root(&self) -> PathBuf {
        match &self.config.asset_root {
            Some(root) => root.clone(),
            None => std::env::current_dir().unwrap_or_else(|_| Path::new(".").to_path_buf()),
        }
    }
}
