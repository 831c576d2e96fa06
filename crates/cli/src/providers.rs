//! HTTP adapters for the embedding and rerank services.

use async_trait::async_trait;
use chunkit_search::Reranker;
use chunkit_vector_store::{ensure_dimension, l2_normalize, Embedder, Result, VectorStoreError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const EMBEDDING: &str = "embedding";
const RERANK: &str = "rerank";

fn client(timeout: Duration, service: &'static str) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| VectorStoreError::upstream(service, format!("http client: {err}")))
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{path}", base.trim_end_matches('/'))
}

/// OpenAI-compatible `POST {base}/embeddings`
pub struct HttpEmbedder {
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
    batch_size: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: client(timeout, EMBEDDING)?,
            url: endpoint(base_url, "embeddings"),
            model: model.into(),
            api_key,
            dimension,
            batch_size: 32,
        })
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut request = self.client.post(&self.url).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| VectorStoreError::upstream(EMBEDDING, err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VectorStoreError::upstream(
                EMBEDDING,
                format!("{status}: {}", body.trim()),
            ));
        }
        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| VectorStoreError::upstream(EMBEDDING, format!("bad response: {err}")))?;
        vectors_in_order(body, texts.len())
    }
}

/// Vectors sorted by their `index` field, checked against the input count
fn vectors_in_order(body: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if body.data.len() != expected {
        return Err(VectorStoreError::upstream(
            EMBEDDING,
            format!("{} vectors for {expected} texts", body.data.len()),
        ));
    }
    let mut items: Vec<(usize, Vec<f32>)> = body
        .data
        .into_iter()
        .enumerate()
        .map(|(pos, item)| (item.index.unwrap_or(pos), item.embedding))
        .collect();
    items.sort_by_key(|(index, _)| *index);
    Ok(items.into_iter().map(|(_, vector)| vector).collect())
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            for mut vector in self.request(batch).await? {
                ensure_dimension(self.dimension, &vector)?;
                l2_normalize(&mut vector);
                vectors.push(vector);
            }
        }
        log::debug!("Embedded {} texts via {}", texts.len(), self.url);
        Ok(vectors)
    }
}

/// `POST {base}/rerank` with `{query, documents}`, answered by
/// `{results: [{index, relevance_score}]}`
pub struct HttpReranker {
    client: Client,
    url: String,
    model: Option<String>,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    query: &'a str,
    documents: &'a [String],
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

impl HttpReranker {
    pub fn new(
        base_url: &str,
        model: Option<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: client(timeout, RERANK)?,
            url: endpoint(base_url, "rerank"),
            model,
            api_key,
        })
    }
}

/// One score per candidate; every candidate must be scored
fn scores_by_index(results: Vec<RerankResult>, candidates: usize) -> Result<Vec<f32>> {
    let mut scores: Vec<Option<f32>> = vec![None; candidates];
    for result in results {
        match scores.get_mut(result.index) {
            Some(slot) => *slot = Some(result.relevance_score),
            None => {
                return Err(VectorStoreError::upstream(
                    RERANK,
                    format!("index {} out of range", result.index),
                ))
            }
        }
    }
    scores
        .into_iter()
        .enumerate()
        .map(|(index, score)| {
            score.ok_or_else(|| {
                VectorStoreError::upstream(RERANK, format!("candidate {index} was not scored"))
            })
        })
        .collect()
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>> {
        let mut request = self.client.post(&self.url).json(&RerankRequest {
            model: self.model.as_deref(),
            query,
            documents: candidates,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| VectorStoreError::upstream(RERANK, err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(VectorStoreError::upstream(RERANK, status.to_string()));
        }
        let body: RerankResponse = response
            .json()
            .await
            .map_err(|err| VectorStoreError::upstream(RERANK, format!("bad response: {err}")))?;
        scores_by_index(body.results, candidates.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn embeddings_are_reordered_by_index() {
        let body: EmbeddingResponse = serde_json::from_value(json!({
            "object": "list",
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        }))
        .unwrap();
        let vectors = vectors_in_order(body, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn short_embedding_response_is_upstream_error() {
        let body: EmbeddingResponse =
            serde_json::from_value(json!({"data": [{"embedding": [1.0]}]})).unwrap();
        let err = vectors_in_order(body, 2).unwrap_err();
        assert!(err.is_upstream());
    }

    #[test]
    fn rerank_scores_follow_candidate_order() {
        let body: RerankResponse = serde_json::from_value(json!({
            "results": [
                {"index": 2, "relevance_score": 0.9},
                {"index": 0, "relevance_score": 0.1},
                {"index": 1, "relevance_score": 0.5}
            ]
        }))
        .unwrap();
        assert_eq!(scores_by_index(body.results, 3).unwrap(), vec![0.1, 0.5, 0.9]);
    }

    #[test]
    fn partial_rerank_response_is_rejected() {
        let body: RerankResponse = serde_json::from_value(json!({
            "results": [{"index": 0, "relevance_score": 0.1}]
        }))
        .unwrap();
        assert!(scores_by_index(body.results, 2).is_err());

        let body: RerankResponse = serde_json::from_value(json!({
            "results": [{"index": 5, "relevance_score": 0.1}]
        }))
        .unwrap();
        assert!(scores_by_index(body.results, 2).is_err());
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        assert_eq!(endpoint("http://host/v1/", "embeddings"), "http://host/v1/embeddings");
        assert_eq!(endpoint("http://host", "rerank"), "http://host/rerank");
    }
}
