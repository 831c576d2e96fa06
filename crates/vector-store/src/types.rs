use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form key/value metadata attached to a chunk
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata key carrying the origin tag
pub const ORIGIN_KEY: &str = "type";

/// Id prefix reserved for image-derived chunks
pub const IMAGE_ID_PREFIX: &str = "image_";

/// Where a chunk's text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkOrigin {
    Text,
    ImageDescription,
}

impl ChunkOrigin {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::ImageDescription => "image_description",
        }
    }

    /// Metadata map pre-populated with this origin tag
    #[must_use]
    pub fn metadata(self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert(ORIGIN_KEY.to_string(), Value::from(self.as_str()));
        metadata
    }
}

/// A stored chunk: content plus metadata.
///
/// On disk the record is a flat JSON object (`{"id", "content", "type", ...}`),
/// so sidecars written without an origin tag still load. A `type` value that
/// is not an origin stays in `metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawChunkRecord")]
pub struct ChunkRecord {
    pub id: String,
    pub content: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<ChunkOrigin>,
    #[serde(flatten)]
    pub metadata: Metadata,
}

impl ChunkRecord {
    /// Build a record, lifting a recognised `type` entry out of `metadata`
    #[must_use]
    pub fn new(id: impl Into<String>, content: impl Into<String>, mut metadata: Metadata) -> Self {
        let origin = match metadata.get(ORIGIN_KEY) {
            Some(raw) => serde_json::from_value::<ChunkOrigin>(raw.clone()).ok(),
            None => None,
        };
        if origin.is_some() {
            metadata.remove(ORIGIN_KEY);
        }
        metadata.remove("id");
        metadata.remove("content");

        Self {
            id: id.into(),
            content: content.into(),
            origin,
            metadata,
        }
    }

    /// Explicit origin tag, or the `image_<n>:` content prefix for records
    /// written without one
    #[must_use]
    pub fn origin(&self) -> ChunkOrigin {
        self.origin.unwrap_or_else(|| {
            if split_image_tag(&self.content).is_some() {
                ChunkOrigin::ImageDescription
            } else {
                ChunkOrigin::Text
            }
        })
    }
}

#[derive(Deserialize)]
struct RawChunkRecord {
    id: String,
    content: String,
    #[serde(flatten)]
    rest: Metadata,
}

impl From<RawChunkRecord> for ChunkRecord {
    fn from(raw: RawChunkRecord) -> Self {
        Self::new(raw.id, raw.content, raw.rest)
    }
}

/// Image id for the n-th image asset
#[must_use]
pub fn image_id(n: usize) -> String {
    format!("{IMAGE_ID_PREFIX}{n}")
}

/// Parse `image_<n>` into `n`
#[must_use]
pub fn parse_image_id(id: &str) -> Option<usize> {
    let digits = id.strip_prefix(IMAGE_ID_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Split `"image_<n>: caption"` into `("image_<n>", "caption")`
#[must_use]
pub fn split_image_tag(content: &str) -> Option<(&str, &str)> {
    let (tag, caption) = content.split_once(':')?;
    let tag = tag.trim();
    parse_image_id(tag)?;
    Some((tag, caption.trim()))
}

/// A search hit with its distance and a similarity score in (0, 1]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub record: ChunkRecord,
    pub distance: f32,
    pub score: f32,
}

impl SearchHit {
    #[must_use]
    pub fn new(record: ChunkRecord, distance: f32) -> Self {
        Self {
            record,
            distance,
            score: distance_to_score(distance),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.record.id
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.record.content
    }
}

/// Monotonically decreasing map from distance to similarity
#[must_use]
pub fn distance_to_score(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

/// Counts reported by [`crate::VectorStore::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Live (non-deleted) chunks
    pub live: usize,
    pub text: usize,
    pub image: usize,
    /// Physical vectors, including soft-deleted ones
    pub index_size: usize,
    pub next_slot: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn record_lifts_origin_out_of_metadata() {
        let mut metadata = ChunkOrigin::ImageDescription.metadata();
        metadata.insert("image_id".to_string(), json!("image_3"));
        let record = ChunkRecord::new("image_3", "image_3: a chart", metadata);

        assert_eq!(record.origin, Some(ChunkOrigin::ImageDescription));
        assert!(!record.metadata.contains_key(ORIGIN_KEY));
        assert_eq!(record.metadata.get("image_id"), Some(&json!("image_3")));
    }

    #[test]
    fn record_serializes_flat() {
        let mut metadata = ChunkOrigin::Text.metadata();
        metadata.insert("source_file".to_string(), json!("guide.md"));
        let record = ChunkRecord::new("guide.md_chunk_0", "hello", metadata);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({"id": "guide.md_chunk_0", "content": "hello", "type": "text", "source_file": "guide.md"})
        );

        let back: ChunkRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn untagged_records_fall_back_to_content_prefix() {
        let legacy: ChunkRecord =
            serde_json::from_value(json!({"id": "image_desc_0", "content": "image_0: a photo"}))
                .unwrap();
        assert_eq!(legacy.origin, None);
        assert_eq!(legacy.origin(), ChunkOrigin::ImageDescription);

        let text: ChunkRecord =
            serde_json::from_value(json!({"id": "a", "content": "imagery: not a tag"})).unwrap();
        assert_eq!(text.origin(), ChunkOrigin::Text);
    }

    #[test]
    fn foreign_type_value_stays_metadata() {
        let mut metadata = Metadata::new();
        metadata.insert(ORIGIN_KEY.to_string(), json!("pdf"));
        let record = ChunkRecord::new("a", "hello", metadata);
        assert_eq!(record.origin, None);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"id": "a", "content": "hello", "type": "pdf"}));

        let back: ChunkRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.origin(), ChunkOrigin::Text);
    }

    #[test]
    fn image_tag_parsing() {
        assert_eq!(parse_image_id("image_12"), Some(12));
        assert_eq!(parse_image_id("image_"), None);
        assert_eq!(parse_image_id("image_x1"), None);
        assert_eq!(
            split_image_tag("image_0: a campus library photo"),
            Some(("image_0", "a campus library photo"))
        );
        assert_eq!(split_image_tag("image_0 a photo"), None);
        assert_eq!(image_id(7), "image_7");
    }

    #[test]
    fn score_is_in_unit_interval() {
        assert!((distance_to_score(0.0) - 1.0).abs() < f32::EPSILON);
        assert!(distance_to_score(3.0) < distance_to_score(1.0));
        assert!(distance_to_score(1e9) > 0.0);
    }
}
