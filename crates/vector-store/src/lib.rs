//! # Chunkit Vector Store
//!
//! Persistent, incrementally updatable vector storage for chunked documents.
//!
//! ## Features
//!
//! - **Exact L2 search** over a flat, append-only index
//! - **Stable ids** mapped to slots that are never reused
//! - **Soft delete** with over-fetching search so deletions never shrink results
//! - **Two-file persistence**: binary index + JSON sidecar, written atomically
//!
//! ## Architecture
//!
//! ```text
//! VectorStore
//!     │
//!     ├──> FlatIndex        slot → vector      ({collection}.index)
//!     │
//!     ├──> IdentityMap      id ↔ slot          ┐
//!     │                                         ├─ {collection}_metadata.json
//!     └──> MetadataStore    id → ChunkRecord   ┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use chunkit_vector_store::{Embedder, StorePaths, StubEmbedder, VectorStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let embedder = StubEmbedder::new(1024);
//!     let mut store = VectorStore::open(StorePaths::new("./faiss_index1", "docs"), 1024)?;
//!
//!     let docs = vec!["cats are mammals".to_string()];
//!     let vectors = embedder.embed_documents(&docs).await?;
//!     store.add(&docs, &vectors, &["t1".to_string()], None)?;
//!
//!     let query = embedder.embed_query("what is a cat").await?;
//!     for hit in store.search(&query, 5)? {
//!         println!("{}: {:.3}", hit.id(), hit.score);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod embeddings;
mod error;
mod flat_index;
mod identity;
mod metadata;
mod paths;
mod store;
mod types;

pub use embeddings::{ensure_dimension, l2_normalize, Embedder, StubEmbedder};
pub use error::{Result, VectorStoreError};
pub use flat_index::FlatIndex;
pub use identity::IdentityMap;
pub use metadata::MetadataStore;
pub use paths::{write_atomic, StorePaths, DEFAULT_COLLECTION, DEFAULT_INDEX_DIR};
pub use store::{LoadOutcome, SharedStore, VectorStore};
pub use types::{
    distance_to_score, image_id, parse_image_id, split_image_tag, ChunkOrigin, ChunkRecord,
    Metadata, SearchHit, StoreStats, IMAGE_ID_PREFIX, ORIGIN_KEY,
};
