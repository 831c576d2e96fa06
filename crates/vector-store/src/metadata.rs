use crate::error::{Result, VectorStoreError};
use crate::types::{ChunkOrigin, ChunkRecord, Metadata};
use std::collections::BTreeMap;

/// System of record for chunk content, keyed by external id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataStore {
    records: BTreeMap<String, ChunkRecord>,
}

impl MetadataStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn from_records(records: BTreeMap<String, ChunkRecord>) -> Self {
        Self { records }
    }

    pub fn put(&mut self, id: &str, content: &str, metadata: Metadata) {
        self.insert(ChunkRecord::new(id, content, metadata));
    }

    pub fn insert(&mut self, record: ChunkRecord) {
        self.records.insert(record.id.clone(), record);
    }

    pub fn get(&self, id: &str) -> Result<&ChunkRecord> {
        self.records
            .get(id)
            .ok_or_else(|| VectorStoreError::NotFound(id.to_string()))
    }

    pub fn remove(&mut self, id: &str) -> Option<ChunkRecord> {
        self.records.remove(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn records(&self) -> impl Iterator<Item = &ChunkRecord> {
        self.records.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Live chunk counts as `(text, image)`
    #[must_use]
    pub fn origin_counts(&self) -> (usize, usize) {
        self.records
            .values()
            .fold((0, 0), |(text, image), record| match record.origin() {
                ChunkOrigin::Text => (text + 1, image),
                ChunkOrigin::ImageDescription => (text, image + 1),
            })
    }

    #[must_use]
    pub const fn as_map(&self) -> &BTreeMap<String, ChunkRecord> {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_get_remove() {
        let mut store = MetadataStore::new();
        let mut metadata = Metadata::new();
        metadata.insert("source_file".to_string(), json!("a.txt"));
        store.put("a.txt_chunk_0", "hello", metadata);

        let record = store.get("a.txt_chunk_0").unwrap();
        assert_eq!(record.content, "hello");
        assert_eq!(record.metadata["source_file"], json!("a.txt"));

        assert!(store.remove("a.txt_chunk_0").is_some());
        assert!(matches!(
            store.get("a.txt_chunk_0"),
            Err(VectorStoreError::NotFound(_))
        ));
        assert!(store.remove("a.txt_chunk_0").is_none());
    }

    #[test]
    fn origin_counts_split_text_and_images() {
        let mut store = MetadataStore::new();
        store.put("t", "plain", ChunkOrigin::Text.metadata());
        store.put("image_0", "image_0: photo", ChunkOrigin::ImageDescription.metadata());
        store.put("legacy", "image_1: chart", Metadata::new());
        assert_eq!(store.origin_counts(), (1, 2));
        assert_eq!(store.ids().collect::<Vec<_>>(), vec!["image_0", "legacy", "t"]);
    }
}
