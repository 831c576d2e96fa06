//! # Chunkit Chunker
//!
//! Token-bounded text splitting for embedding pipelines.
//!
//! ## Philosophy
//!
//! Segments should stay readable on their own, so the splitter prefers the
//! coarsest boundary that works:
//! - Paragraph breaks first, then line breaks
//! - Sentence breaks, then clause breaks, then words
//! - A hard character split only when nothing else fits the budget
//!
//! Consecutive segments share a tail of up to `chunk_overlap` tokens so that
//! facts spanning a boundary are still retrievable from either side.
//!
//! ## Architecture
//!
//! ```text
//! Text
//!     │
//!     ├──> Separator selection (first one yielding ≥ 2 pieces)
//!     │
//!     ├──> Pieces within budget ──> Merge with overlap window
//!     │
//!     └──> Oversized pieces ──> Recurse with the next separator
//! ```
//!
//! ## Example
//!
//! ```rust
//! use chunkit_chunker::{Chunker, ChunkerConfig};
//!
//! let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
//! let segments = chunker.split("First paragraph.\n\nSecond paragraph.");
//! assert_eq!(segments.len(), 1);
//! ```

mod config;
mod error;
mod length;
mod splitter;

pub use config::{ChunkerConfig, DEFAULT_SEPARATORS};
pub use error::{ChunkerError, Result};
pub use length::{CharCounter, LengthFunction, TokenizerCounter, WordCounter};
pub use splitter::Chunker;
