use serde::{Deserialize, Serialize};

/// Statistics about one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Documents chunked and added
    pub documents: usize,

    /// Text chunks added
    pub chunks: usize,

    /// Image captions added
    pub images: usize,

    /// Documents skipped (empty, no reader, no chunks)
    pub skipped: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,

    /// Failures that were logged and skipped
    pub errors: Vec<String>,
}

impl IngestStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&mut self, chunks: usize) {
        self.documents += 1;
        self.chunks += chunks;
    }

    pub fn add_images(&mut self, count: usize) {
        self.images += count;
    }

    pub fn add_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }
}
