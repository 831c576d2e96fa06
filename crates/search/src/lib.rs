//! # Chunkit Search
//!
//! Query-time half of chunkit: embed the question, over-fetch nearest
//! chunks, optionally rerank them, then classify each hit as text or image.
//!
//! ```text
//! query ─> Embedder::embed_query ─> VectorStore::search(min(k*3, 50))
//!                                        │
//!                          Reranker::score (when candidates > k)
//!                                        │
//!                         classify ─> [{type, document, source}]
//! ```

mod classify;
mod error;
mod pipeline;
mod prompt;
mod rerank;
mod result;

pub use classify::{classify, resolve_image_path, IMAGE_NOT_FOUND};
pub use error::{Result, SearchError, NO_RELEVANT_CONTENT};
pub use pipeline::{RetrievalConfig, RetrievalPipeline};
pub use prompt::{passages_from, split_paragraphs, AnswerPrompt, Persona, PARAGRAPH_DELIMITER};
pub use rerank::{Bm25Config, Bm25Reranker, Reranker};
pub use result::{ResultKind, RetrievedItem};
