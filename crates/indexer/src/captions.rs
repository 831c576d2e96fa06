use crate::error::{IndexerError, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CAPTION_MANIFEST_FILE: &str = "processed_images.json";

/// An image extracted from a document, already described by the vision model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionedImage {
    /// File name of the document the image came from
    pub source_file: String,
    pub context_before: String,
    pub context_after: String,
    pub original_description: String,
    pub enhanced_description: String,
    /// Raw bytes, when the source hands them over
    pub image_data: Option<Vec<u8>>,
    /// Existing location on disk, when the source already stored the image
    pub image_path: Option<PathBuf>,
}

/// Supplies captioned images for a source directory
#[async_trait]
pub trait CaptionSource: Send + Sync {
    async fn captions(&self, source_dir: &Path) -> Result<Vec<CaptionedImage>>;
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    source_file: String,
    #[serde(default)]
    context_before: String,
    #[serde(default)]
    context_after: String,
    #[serde(default)]
    original_description: String,
    enhanced_description: String,
    #[serde(default)]
    image_data_base64: Option<String>,
    #[serde(default)]
    image_path: Option<PathBuf>,
}

/// Reads the `processed_images.json` manifest written by the captioning job
#[derive(Debug, Clone)]
pub struct CaptionManifestSource {
    file_name: String,
}

impl Default for CaptionManifestSource {
    fn default() -> Self {
        Self {
            file_name: CAPTION_MANIFEST_FILE.to_string(),
        }
    }
}

impl CaptionManifestSource {
    #[must_use]
    pub fn with_file_name(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

#[async_trait]
impl CaptionSource for CaptionManifestSource {
    async fn captions(&self, source_dir: &Path) -> Result<Vec<CaptionedImage>> {
        let path = source_dir.join(&self.file_name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No caption manifest at {}", path.display());
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };

        let entries: Vec<ManifestEntry> = serde_json::from_slice(&bytes)
            .map_err(|err| IndexerError::Caption(format!("{}: {err}", path.display())))?;

        let mut images = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.into_iter().enumerate() {
            let image_data = match entry.image_data_base64.as_deref() {
                Some(encoded) => match STANDARD.decode(encoded.trim()) {
                    Ok(bytes) => Some(bytes),
                    Err(err) => {
                        log::warn!("Manifest entry {idx} has invalid image data: {err}");
                        None
                    }
                },
                None => None,
            };
            images.push(CaptionedImage {
                source_file: entry.source_file,
                context_before: entry.context_before,
                context_after: entry.context_after,
                original_description: entry.original_description,
                enhanced_description: entry.enhanced_description,
                image_data,
                image_path: entry.image_path,
            });
        }

        log::info!("Loaded {} captioned images from {}", images.len(), path.display());
        Ok(images)
    }
}
