//! # Chunkit Indexer
//!
//! Multi-modal ingestion: documents become text chunks, captioned images
//! become `image_<n>` chunks, and both land in the same vector store.
//!
//! ## Pipeline
//!
//! ```text
//! Source directory
//!     │
//!     ├──> DocumentScanner (.txt .md .markdown .pdf .docx)
//!     │      └─> DocumentReader → Chunker → Embedder
//!     │             └─> <doc>_chunk_<n>
//!     │
//!     ├──> CaptionSource (processed_images.json)
//!     │      └─> ImageAssetMap (image_mapping.json) + Embedder
//!     │             └─> image_<n>: <caption>
//!     │
//!     └──> VectorStore (under {collection}.lock)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use chunkit_chunker::{Chunker, ChunkerConfig};
//! use chunkit_indexer::{IngestConfig, IngestionPipeline};
//! use chunkit_vector_store::{StorePaths, StubEmbedder, VectorStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = VectorStore::open(StorePaths::new("./faiss_index1", "docs"), 1024)?;
//!     let pipeline = IngestionPipeline::new(
//!         store.into_shared(),
//!         Arc::new(StubEmbedder::new(1024)),
//!         Arc::new(Chunker::new(ChunkerConfig::default())?),
//!         IngestConfig::default(),
//!     );
//!
//!     let stats = pipeline.build("./documents").await?;
//!     println!("Indexed {} documents, {} chunks", stats.documents, stats.chunks);
//!     Ok(())
//! }
//! ```

mod captions;
mod config;
mod error;
mod images;
mod index_lock;
mod pipeline;
mod reader;
mod scanner;
mod stats;

pub use captions::{CaptionManifestSource, CaptionSource, CaptionedImage, CAPTION_MANIFEST_FILE};
pub use config::{
    IngestConfig, DEFAULT_IMAGE_MAPPING_FILE, DEFAULT_IMAGE_OUTPUT_DIR, SUPPORTED_EXTENSIONS,
};
pub use error::{IndexerError, Result};
pub use images::{ImageAsset, ImageAssetMap};
pub use index_lock::{acquire_index_write_lock, IndexWriteLock};
pub use pipeline::{chunk_id_prefix, IngestionPipeline, CHUNK_ID_INFIX};
pub use reader::{DocumentReader, PlainTextReader, ReaderRegistry};
pub use scanner::{DocumentScanner, ScanOptions};
pub use stats::IngestStats;
