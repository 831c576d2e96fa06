use serde::{Deserialize, Serialize};

/// Kind of a retrieved item; serialized as `0` (text) or `1` (image)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ResultKind {
    Text,
    Image,
}

impl From<ResultKind> for u8 {
    fn from(kind: ResultKind) -> Self {
        match kind {
            ResultKind::Text => 0,
            ResultKind::Image => 1,
        }
    }
}

impl TryFrom<u8> for ResultKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Text),
            1 => Ok(Self::Image),
            other => Err(format!("unknown result type {other}")),
        }
    }
}

/// One formatted retrieval result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedItem {
    #[serde(rename = "type")]
    pub kind: ResultKind,
    /// Chunk text, or the image caption without its `image_<n>:` tag
    pub document: String,
    /// Empty for text; resolved image path or a not-found message for images
    pub source: String,
}

impl RetrievedItem {
    #[must_use]
    pub fn text(document: impl Into<String>) -> Self {
        Self {
            kind: ResultKind::Text,
            document: document.into(),
            source: String::new(),
        }
    }

    #[must_use]
    pub fn image(document: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            kind: ResultKind::Image,
            document: document.into(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.kind == ResultKind::Image
    }
}
