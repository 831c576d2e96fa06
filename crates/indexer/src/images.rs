use crate::error::Result;
use chunkit_vector_store::{parse_image_id, write_atomic};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Descriptor of one extracted image, keyed by its `image_<n>` id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageAsset {
    pub image_path: String,
    pub image_filename: String,
    pub processed_path: String,
    pub source_file: String,
    pub context_before: String,
    pub context_after: String,
    /// Raw caption from the vision model
    pub ai_description: String,
    /// Caption rewritten with the surrounding text; this is what gets indexed
    pub enhanced_description: String,
    pub image_size: u64,
}

/// `image_<n>` → [`ImageAsset`], persisted whole as one JSON object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageAssetMap {
    assets: BTreeMap<String, ImageAsset>,
}

impl ImageAssetMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the mapping file. A missing or unreadable file yields an empty map.
    pub fn load(path: &Path) -> Self {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No image mapping at {}", path.display());
                return Self::new();
            }
            Err(err) => {
                log::warn!("Cannot read image mapping {}: {err}", path.display());
                return Self::new();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(map) => map,
            Err(err) => {
                log::warn!("Image mapping {} is corrupt, ignoring: {err}", path.display());
                Self::new()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &json)?;
        log::debug!("Saved {} image assets to {}", self.len(), path.display());
        Ok(())
    }

    #[must_use]
    pub fn get(&self, image_id: &str) -> Option<&ImageAsset> {
        self.assets.get(image_id)
    }

    pub fn insert(&mut self, image_id: impl Into<String>, asset: ImageAsset) {
        self.assets.insert(image_id.into(), asset);
    }

    /// Smallest `n` such that no `image_m` with `m >= n` exists
    #[must_use]
    pub fn next_index(&self) -> usize {
        self.assets
            .keys()
            .filter_map(|id| parse_image_id(id))
            .map(|n| n + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ImageAsset)> {
        self.assets.iter().map(|(id, asset)| (id.as_str(), asset))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
