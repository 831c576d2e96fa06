use async_trait::async_trait;
use chunkit_indexer::{ImageAsset, ImageAssetMap};
use chunkit_search::{
    Bm25Reranker, Reranker, ResultKind, RetrievalConfig, RetrievalPipeline, RetrievedItem,
    SearchError,
};
use chunkit_vector_store::{
    ChunkOrigin, Embedder, Metadata, SharedStore, StorePaths, VectorStore, VectorStoreError,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::TempDir;

const DIM: usize = 4;

/// Every query lands on the first axis
struct AxisEmbedder;

#[async_trait]
impl Embedder for AxisEmbedder {
    fn dimension(&self) -> usize {
        DIM
    }

    async fn embed_documents(
        &self,
        texts: &[String],
    ) -> chunkit_vector_store::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0, 0.0]).collect())
    }
}

struct DownEmbedder;

#[async_trait]
impl Embedder for DownEmbedder {
    fn dimension(&self) -> usize {
        DIM
    }

    async fn embed_documents(
        &self,
        _texts: &[String],
    ) -> chunkit_vector_store::Result<Vec<Vec<f32>>> {
        Err(VectorStoreError::upstream("embedding", "connection refused"))
    }
}

struct DownReranker;

#[async_trait]
impl Reranker for DownReranker {
    async fn score(
        &self,
        _query: &str,
        _candidates: &[String],
    ) -> chunkit_vector_store::Result<Vec<f32>> {
        Err(VectorStoreError::upstream("rerank", "503 Service Unavailable"))
    }
}

/// Returns one score regardless of candidate count
struct ShortReranker;

#[async_trait]
impl Reranker for ShortReranker {
    async fn score(
        &self,
        _query: &str,
        _candidates: &[String],
    ) -> chunkit_vector_store::Result<Vec<f32>> {
        Ok(vec![10.0])
    }
}

fn open_store(tmp: &TempDir) -> SharedStore {
    VectorStore::open(StorePaths::new(tmp.path().join("index"), "docs"), DIM)
        .expect("open store")
        .into_shared()
}

/// Four text chunks at increasing distance from the first axis
async fn seed_text(store: &SharedStore) {
    let docs = [
        "gym opens at six",
        "library hours are eight to ten",
        "canteen menu changes weekly",
        "campus mail address",
    ];
    let ids = ["t0", "t1", "t2", "t3"];
    let vectors: [Vec<f32>; 4] = [
        vec![1.0, 0.0, 0.0, 0.0],
        vec![0.9, 0.1, 0.0, 0.0],
        vec![0.5, 0.5, 0.0, 0.0],
        vec![0.0, 1.0, 0.0, 0.0],
    ];
    let metadatas = vec![ChunkOrigin::Text.metadata(); 4];
    store
        .write()
        .await
        .add(&docs, &vectors, &ids, Some(metadatas))
        .expect("seed text");
}

fn config(tmp: &TempDir) -> RetrievalConfig {
    RetrievalConfig {
        image_mapping_file: tmp.path().join("image_mapping.json"),
        asset_root: Some(tmp.path().to_path_buf()),
        ..RetrievalConfig::default()
    }
}

fn documents(items: &[RetrievedItem]) -> Vec<&str> {
    items.iter().map(|item| item.document.as_str()).collect()
}

#[tokio::test]
async fn image_hit_resolves_to_existing_file() {
    let tmp = TempDir::new().expect("tempdir");
    let store = open_store(&tmp);

    let image_file = tmp.path().join("guide.docx_image_1.jpg");
    std::fs::write(&image_file, b"jpeg").expect("write image");
    let mut assets = ImageAssetMap::new();
    assets.insert(
        "image_0",
        ImageAsset {
            image_path: image_file.to_string_lossy().into_owned(),
            source_file: "guide.docx".to_string(),
            enhanced_description: "a campus library photo".to_string(),
            ..ImageAsset::default()
        },
    );
    assets
        .save(&tmp.path().join("image_mapping.json"))
        .expect("save assets");

    let mut metadata: Metadata = ChunkOrigin::ImageDescription.metadata();
    metadata.insert("image_id".into(), "image_0".into());
    store
        .write()
        .await
        .add(
            &["image_0: a campus library photo", "unrelated text"],
            &[vec![1.0_f32, 0.0, 0.0, 0.0], vec![0.0_f32, 0.0, 0.0, 1.0]],
            &["image_0", "t9"],
            Some(vec![metadata, ChunkOrigin::Text.metadata()]),
        )
        .expect("add image");

    let pipeline = RetrievalPipeline::new(store, Arc::new(AxisEmbedder), config(&tmp));
    let items = pipeline.retrieve("library photo", 1).await.expect("retrieve");

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind, ResultKind::Image);
    assert_eq!(items[0].document, "a campus library photo");
    assert_eq!(items[0].source, image_file.to_string_lossy());
}

#[tokio::test]
async fn failing_reranker_keeps_vector_order() {
    let tmp = TempDir::new().expect("tempdir");
    let store = open_store(&tmp);
    seed_text(&store).await;

    let pipeline = RetrievalPipeline::new(store, Arc::new(AxisEmbedder), config(&tmp))
        .with_reranker(Some(Arc::new(DownReranker)));
    let items = pipeline.retrieve("when is the library open", 2).await.expect("retrieve");

    assert_eq!(
        documents(&items),
        vec!["gym opens at six", "library hours are eight to ten"]
    );
    assert!(items.iter().all(|item| item.kind == ResultKind::Text));
    assert!(items.iter().all(|item| item.source.is_empty()));
}

#[tokio::test]
async fn mismatched_score_count_keeps_vector_order() {
    let tmp = TempDir::new().expect("tempdir");
    let store = open_store(&tmp);
    seed_text(&store).await;

    let pipeline = RetrievalPipeline::new(store, Arc::new(AxisEmbedder), config(&tmp))
        .with_reranker(Some(Arc::new(ShortReranker)));
    let items = pipeline.retrieve("anything", 3).await.expect("retrieve");

    assert_eq!(
        documents(&items),
        vec![
            "gym opens at six",
            "library hours are eight to ten",
            "canteen menu changes weekly"
        ]
    );
}

#[tokio::test]
async fn bm25_reranker_promotes_lexical_match() {
    let tmp = TempDir::new().expect("tempdir");
    let store = open_store(&tmp);
    seed_text(&store).await;

    let pipeline = RetrievalPipeline::new(store, Arc::new(AxisEmbedder), config(&tmp))
        .with_reranker(Some(Arc::new(Bm25Reranker::default())));
    let items = pipeline.retrieve("library hours", 1).await.expect("retrieve");

    assert_eq!(documents(&items), vec!["library hours are eight to ten"]);
}

#[tokio::test]
async fn reranker_is_skipped_when_candidates_fit() {
    let tmp = TempDir::new().expect("tempdir");
    let store = open_store(&tmp);
    seed_text(&store).await;

    let pipeline = RetrievalPipeline::new(store, Arc::new(AxisEmbedder), config(&tmp))
        .with_reranker(Some(Arc::new(DownReranker)));
    let items = pipeline.retrieve("campus", 10).await.expect("retrieve");

    assert_eq!(items.len(), 4);
    assert_eq!(items[3].document, "campus mail address");
}

#[tokio::test]
async fn deleted_chunks_are_not_returned() {
    let tmp = TempDir::new().expect("tempdir");
    let store = open_store(&tmp);
    seed_text(&store).await;
    store.write().await.delete(&["t0"]).expect("delete");

    let pipeline = RetrievalPipeline::new(store, Arc::new(AxisEmbedder), config(&tmp));
    let items = pipeline.retrieve("gym", 1).await.expect("retrieve");

    assert_eq!(documents(&items), vec!["library hours are eight to ten"]);
}

#[tokio::test]
async fn empty_store_returns_nothing() {
    let tmp = TempDir::new().expect("tempdir");
    let pipeline = RetrievalPipeline::new(open_store(&tmp), Arc::new(AxisEmbedder), config(&tmp));

    let items = pipeline.retrieve("anything", 5).await.expect("retrieve");
    assert!(items.is_empty());
}

#[tokio::test]
async fn blank_query_is_rejected() {
    let tmp = TempDir::new().expect("tempdir");
    let pipeline = RetrievalPipeline::new(open_store(&tmp), Arc::new(AxisEmbedder), config(&tmp));

    let err = pipeline.retrieve("   ", 5).await.expect_err("blank query");
    assert!(matches!(err, SearchError::EmptyQuery));
}

#[tokio::test]
async fn query_embedding_failure_is_upstream() {
    let tmp = TempDir::new().expect("tempdir");
    let store = open_store(&tmp);
    seed_text(&store).await;

    let pipeline = RetrievalPipeline::new(store, Arc::new(DownEmbedder), config(&tmp));
    let err = pipeline.retrieve("gym", 2).await.expect_err("embedding down");
    assert!(err.is_upstream());
    assert!(err.user_message().contains("embedding service is unavailable"));
}
