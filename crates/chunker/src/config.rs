use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Separators in priority order: paragraph, line, sentence, clause, word,
/// and finally the empty separator (hard split between characters).
pub const DEFAULT_SEPARATORS: &[&str] = &[
    "\n\n", "\n", "。", "！", "？", ". ", "! ", "? ", "；", "; ", "，", ", ", " ", "",
];

/// Configuration for text splitting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Maximum segment size in tokens (hard limit)
    pub chunk_size: usize,

    /// Tokens shared between consecutive segments
    pub chunk_overlap: usize,

    /// Separators tried in order; the empty string means "split anywhere"
    pub separators: Vec<String>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 300,
            chunk_overlap: 50,
            separators: DEFAULT_SEPARATORS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl ChunkerConfig {
    /// Config with explicit size and overlap, default separators
    #[must_use]
    pub fn with_size(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ChunkerError::invalid_config("chunk_size must be > 0"));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(ChunkerError::invalid_config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        if self.separators.is_empty() {
            return Err(ChunkerError::invalid_config(
                "at least one separator is required",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ChunkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 300);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.separators.last().map(String::as_str), Some(""));
    }

    #[test]
    fn test_config_validation() {
        let mut config = ChunkerConfig::with_size(0, 0);
        assert!(config.validate().is_err());

        config.chunk_size = 100;
        config.chunk_overlap = 100;
        assert!(config.validate().is_err());

        config.chunk_overlap = 20;
        assert!(config.validate().is_ok());

        config.separators.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: ChunkerConfig =
            serde_json::from_str(r#"{"chunk_size": 120}"#).unwrap();
        assert_eq!(config.chunk_size, 120);
        assert_eq!(config.chunk_overlap, 50);
    }
}
