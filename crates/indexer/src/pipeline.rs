use crate::captions::{CaptionManifestSource, CaptionSource, CaptionedImage};
use crate::config::IngestConfig;
use crate::error::{IndexerError, Result};
use crate::images::{ImageAsset, ImageAssetMap};
use crate::index_lock::acquire_index_write_lock;
use crate::reader::ReaderRegistry;
use crate::scanner::{DocumentScanner, ScanOptions};
use crate::stats::IngestStats;
use chunkit_chunker::Chunker;
use chunkit_vector_store::{
    image_id, parse_image_id, ChunkOrigin, Embedder, Metadata, SharedStore, VectorStoreError,
    IMAGE_ID_PREFIX,
};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Separator between a document name and its chunk number in chunk ids
pub const CHUNK_ID_INFIX: &str = "_chunk_";

/// Id prefix shared by every chunk of `document`
#[must_use]
pub fn chunk_id_prefix(document: &str) -> String {
    format!("{document}{CHUNK_ID_INFIX}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Build,
    Insert,
}

/// Reads, chunks, embeds and stores documents and image captions
pub struct IngestionPipeline {
    store: SharedStore,
    embedder: Arc<dyn Embedder>,
    chunker: Arc<Chunker>,
    readers: ReaderRegistry,
    captions: Option<Arc<dyn CaptionSource>>,
    config: IngestConfig,
}

impl IngestionPipeline {
    pub fn new(
        store: SharedStore,
        embedder: Arc<dyn Embedder>,
        chunker: Arc<Chunker>,
        config: IngestConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            chunker,
            readers: ReaderRegistry::default(),
            captions: Some(Arc::new(CaptionManifestSource::default())),
            config,
        }
    }

    #[must_use]
    pub fn with_readers(mut self, readers: ReaderRegistry) -> Self {
        self.readers = readers;
        self
    }

    /// Replace the caption source; `None` ingests text only
    #[must_use]
    pub fn with_caption_source(mut self, captions: Option<Arc<dyn CaptionSource>>) -> Self {
        self.captions = captions;
        self
    }

    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    #[must_use]
    pub const fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Rebuild the collection from scratch out of `source`
    pub async fn build(&self, source: impl AsRef<Path>) -> Result<IngestStats> {
        self.run(source.as_ref(), Mode::Build).await
    }

    /// Add the documents and images in `source` to the existing collection.
    /// Documents already present are replaced.
    pub async fn insert(&self, source: impl AsRef<Path>) -> Result<IngestStats> {
        self.run(source.as_ref(), Mode::Insert).await
    }

    async fn run(&self, source: &Path, mode: Mode) -> Result<IngestStats> {
        if !source.is_dir() {
            return Err(IndexerError::InvalidPath(format!(
                "{} is not a directory",
                source.display()
            )));
        }

        let started = Instant::now();
        let lock_path = self.store.read().await.paths().lock_file();
        let _lock = acquire_index_write_lock(lock_path).await?;

        log::info!("Ingesting {} ({mode:?})", source.display());
        if mode == Mode::Build {
            self.store.write().await.clear()?;
        }

        let mut stats = IngestStats::new();
        self.ingest_documents(source, mode, &mut stats).await;
        self.ingest_images(source, mode, &mut stats).await?;

        stats.time_ms = (started.elapsed().as_millis() as u64).max(1);
        log::info!(
            "Ingested {} documents ({} chunks) and {} images in {} ms; {} skipped, {} errors",
            stats.documents,
            stats.chunks,
            stats.images,
            stats.time_ms,
            stats.skipped,
            stats.errors.len()
        );
        Ok(stats)
    }

    async fn ingest_documents(&self, source: &Path, mode: Mode, stats: &mut IngestStats) {
        let options = ScanOptions {
            recursive: self.config.recursive,
            extensions: self.config.extensions.clone(),
        };
        let files = DocumentScanner::new(source, options).scan();

        for (idx, path) in files.iter().enumerate() {
            log::debug!("Document {}/{}: {}", idx + 1, files.len(), path.display());
            match self.ingest_document(source, path, mode).await {
                Ok(Some(chunks)) => stats.add_document(chunks),
                Ok(None) => stats.add_skipped(),
                Err(err) => {
                    log::warn!("Skipping {}: {err}", path.display());
                    stats.add_error(format!("{}: {err}", path.display()));
                }
            }
        }
    }

    async fn ingest_document(
        &self,
        source: &Path,
        path: &Path,
        mode: Mode,
    ) -> Result<Option<usize>> {
        let Some(reader) = self.readers.reader_for(path) else {
            log::warn!("No reader registered for {}, skipping", path.display());
            return Ok(None);
        };

        let text = reader.read(path).await?;
        if text.trim().is_empty() {
            log::warn!("{} is empty, skipping", path.display());
            return Ok(None);
        }

        let chunks = self.chunker.split(&text);
        if chunks.is_empty() {
            log::warn!("{} produced no chunks, skipping", path.display());
            return Ok(None);
        }

        let document = document_name(source, path);
        let vectors = self.embedder.embed_documents(&chunks).await?;
        self.check_vectors(chunks.len(), &vectors).await?;

        let ids: Vec<String> = (0..chunks.len())
            .map(|n| format!("{}{n}", chunk_id_prefix(&document)))
            .collect();
        let metadatas = (0..chunks.len())
            .map(|n| {
                let mut metadata = ChunkOrigin::Text.metadata();
                metadata.insert("source_file".to_string(), Value::from(document.as_str()));
                metadata.insert("chunk_index".to_string(), Value::from(n));
                metadata
            })
            .collect();

        let mut store = self.store.write().await;
        if mode == Mode::Insert {
            let replaced = store.remove_by_id_prefix(&chunk_id_prefix(&document))?;
            if replaced > 0 {
                log::info!("Replacing {replaced} existing chunks of {document}");
            }
        }
        store.add(&chunks, &vectors, &ids, Some(metadatas))?;
        log::debug!("{document}: {} chunks", chunks.len());
        Ok(Some(chunks.len()))
    }

    async fn ingest_images(
        &self,
        source: &Path,
        mode: Mode,
        stats: &mut IngestStats,
    ) -> Result<()> {
        let images = match &self.captions {
            Some(captions) => match captions.captions(source).await {
                Ok(images) => images,
                Err(err) => {
                    log::warn!("Caption source failed, skipping images: {err}");
                    stats.add_error(format!("captions: {err}"));
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let images: Vec<CaptionedImage> = images
            .into_iter()
            .filter(|image| {
                let keep = !image.enhanced_description.trim().is_empty();
                if !keep {
                    log::warn!("Image from {} has no caption, skipping", image.source_file);
                }
                keep
            })
            .collect();

        let (mut assets, start) = match mode {
            Mode::Build => {
                self.store
                    .write()
                    .await
                    .remove_by_id_prefix(IMAGE_ID_PREFIX)?;
                (ImageAssetMap::new(), 0)
            }
            Mode::Insert => {
                let assets = ImageAssetMap::load(&self.config.image_mapping_file);
                let in_store = self
                    .store
                    .read()
                    .await
                    .ids()
                    .filter_map(parse_image_id)
                    .map(|n| n + 1)
                    .max()
                    .unwrap_or(0);
                let start = assets.next_index().max(in_store);
                (assets, start)
            }
        };

        if images.is_empty() {
            if mode == Mode::Build {
                assets.save(&self.config.image_mapping_file)?;
            }
            return Ok(());
        }

        let mut contents = Vec::with_capacity(images.len());
        let mut ids = Vec::with_capacity(images.len());
        let mut metadatas = Vec::with_capacity(images.len());
        let mut pending = Vec::with_capacity(images.len());
        for (offset, image) in images.iter().enumerate() {
            let n = start + offset;
            let id = image_id(n);
            pending.push(self.materialize_image(image, n).await);

            contents.push(format!("{id}: {}", image.enhanced_description.trim()));
            let mut metadata = ChunkOrigin::ImageDescription.metadata();
            metadata.insert("image_id".to_string(), Value::from(id.as_str()));
            metadata.insert(
                "source_file".to_string(),
                Value::from(image.source_file.as_str()),
            );
            metadatas.push(metadata);
            ids.push(id);
        }

        // Only ids that made it into the store get a descriptor
        let mut pending = pending.into_iter();
        let batch_size = self.config.batch_size();
        for (batch_no, batch_start) in (0..ids.len()).step_by(batch_size).enumerate() {
            let end = (batch_start + batch_size).min(ids.len());
            let result = self
                .add_batch(
                    &contents[batch_start..end],
                    &ids[batch_start..end],
                    metadatas[batch_start..end].to_vec(),
                )
                .await;
            let batch_assets: Vec<_> = pending.by_ref().take(end - batch_start).collect();
            match result {
                Ok(()) => {
                    for (id, asset) in ids[batch_start..end].iter().zip(batch_assets) {
                        assets.insert(id.clone(), asset);
                    }
                    stats.add_images(end - batch_start);
                }
                Err(err) => {
                    log::warn!("Skipping image batch {}: {err}", batch_no + 1);
                    stats.add_error(format!("image batch {}: {err}", batch_no + 1));
                }
            }
        }
        assets.save(&self.config.image_mapping_file)?;
        Ok(())
    }

    async fn add_batch(
        &self,
        contents: &[String],
        ids: &[String],
        metadatas: Vec<Metadata>,
    ) -> Result<()> {
        let vectors = self.embedder.embed_documents(contents).await?;
        self.check_vectors(contents.len(), &vectors).await?;
        self.store
            .write()
            .await
            .add(contents, &vectors, ids, Some(metadatas))?;
        Ok(())
    }

    /// Reject a malformed embedding response before the store is touched
    async fn check_vectors(&self, expected: usize, vectors: &[Vec<f32>]) -> Result<()> {
        if vectors.len() != expected {
            return Err(VectorStoreError::LengthMismatch {
                field: "embeddings",
                expected,
                actual: vectors.len(),
            }
            .into());
        }
        let dimension = self.store.read().await.dimension();
        for vector in vectors {
            chunkit_vector_store::ensure_dimension(dimension, vector)?;
        }
        Ok(())
    }

    /// Store the image bytes (if any) and build its asset descriptor
    async fn materialize_image(&self, image: &CaptionedImage, n: usize) -> ImageAsset {
        let mut asset = ImageAsset {
            source_file: image.source_file.clone(),
            context_before: image.context_before.clone(),
            context_after: image.context_after.clone(),
            ai_description: image.original_description.clone(),
            enhanced_description: image.enhanced_description.clone(),
            ..ImageAsset::default()
        };

        if let Some(bytes) = &image.image_data {
            let source_name = Path::new(&image.source_file)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| image.source_file.clone());
            let filename = format!("{source_name}_image_{}.jpg", n + 1);
            let path = self.config.image_output_dir.join(&filename);
            match write_image(&path, bytes).await {
                Ok(()) => {
                    let stored = path.to_string_lossy().into_owned();
                    asset.processed_path = stored.clone();
                    asset.image_path = stored;
                    asset.image_filename = filename;
                    asset.image_size = bytes.len() as u64;
                }
                Err(err) => log::warn!("Failed to save image {}: {err}", path.display()),
            }
        } else if let Some(path) = &image.image_path {
            let stored = path.to_string_lossy().into_owned();
            asset.processed_path = stored.clone();
            asset.image_path = stored;
            asset.image_filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            asset.image_size = tokio::fs::metadata(path)
                .await
                .map(|meta| meta.len())
                .unwrap_or(0);
        }

        asset
    }
}

async fn write_image(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await
}

/// Document name used in chunk ids: the path relative to the source
/// directory with `/` separators (just the file name at the top level)
fn document_name(source: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(source).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
