use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_IMAGE_OUTPUT_DIR: &str = "./processed_images";
pub const DEFAULT_IMAGE_MAPPING_FILE: &str = "./image_mapping.json";

/// Document formats picked up by the scanner. PDF and Word need a reader
/// registered for them; plain text ships built in.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "pdf", "docx"];

/// Ingestion settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IngestConfig {
    /// Chunks per embedding/add sub-batch for image captions
    pub batch_size: usize,

    /// Where extracted image bytes are written
    pub image_output_dir: PathBuf,

    /// `image_<n>` → asset descriptor JSON
    pub image_mapping_file: PathBuf,

    /// Descend into subdirectories of the source directory
    pub recursive: bool,

    /// Lowercase extensions without the dot
    pub extensions: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            image_output_dir: PathBuf::from(DEFAULT_IMAGE_OUTPUT_DIR),
            image_mapping_file: PathBuf::from(DEFAULT_IMAGE_MAPPING_FILE),
            recursive: false,
            extensions: SUPPORTED_EXTENSIONS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl IngestConfig {
    /// Effective batch size (never zero)
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_layout() {
        let config = IngestConfig::default();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.image_output_dir, PathBuf::from("./processed_images"));
        assert_eq!(config.image_mapping_file, PathBuf::from("./image_mapping.json"));
        assert!(!config.recursive);
        assert!(config.extensions.iter().any(|ext| ext == "docx"));
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        let config = IngestConfig {
            batch_size: 0,
            ..IngestConfig::default()
        };
        assert_eq!(config.batch_size(), 1);
    }
}
