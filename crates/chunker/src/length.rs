use crate::error::{ChunkerError, Result};
use std::path::Path;
use tokenizers::Tokenizer;
use unicode_segmentation::UnicodeSegmentation;

/// Measures text in the unit the chunk budget is expressed in (usually tokens)
pub trait LengthFunction: Send + Sync {
    fn measure(&self, text: &str) -> usize;
}

impl<F> LengthFunction for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn measure(&self, text: &str) -> usize {
        self(text)
    }
}

/// Counts Unicode words (UAX #29). CJK ideographs count one each, which is a
/// reasonable stand-in for BPE token counts on mixed-script documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCounter;

impl LengthFunction for WordCounter {
    fn measure(&self, text: &str) -> usize {
        text.unicode_words().count()
    }
}

/// Counts grapheme clusters
#[derive(Debug, Clone, Copy, Default)]
pub struct CharCounter;

impl LengthFunction for CharCounter {
    fn measure(&self, text: &str) -> usize {
        text.graphemes(true).count()
    }
}

/// Exact token counts from a HuggingFace `tokenizer.json`
pub struct TokenizerCounter {
    tokenizer: Tokenizer,
}

impl TokenizerCounter {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let tokenizer = Tokenizer::from_file(path).map_err(|err| {
            ChunkerError::tokenizer(format!("load {}: {err}", path.display()))
        })?;
        Ok(Self { tokenizer })
    }
}

impl LengthFunction for TokenizerCounter {
    fn measure(&self, text: &str) -> usize {
        match self.tokenizer.encode(text, false) {
            Ok(encoding) => encoding.len(),
            Err(err) => {
                log::debug!("Tokenizer failed, counting words instead: {err}");
                WordCounter.measure(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn word_counter_ignores_punctuation_and_whitespace() {
        assert_eq!(WordCounter.measure("Hello, world!  Again."), 3);
        assert_eq!(WordCounter.measure("   "), 0);
    }

    #[test]
    fn word_counter_counts_ideographs_individually() {
        assert_eq!(WordCounter.measure("校园邮箱"), 4);
    }

    #[test]
    fn char_counter_counts_graphemes() {
        assert_eq!(CharCounter.measure("abc"), 3);
        assert_eq!(CharCounter.measure("e\u{301}"), 1);
    }

    #[test]
    fn closures_are_length_functions() {
        let bytes = |text: &str| text.len();
        assert_eq!(bytes.measure("four"), 4);
    }

    #[test]
    fn tokenizer_counter_rejects_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokenizer.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            TokenizerCounter::from_file(&path),
            Err(ChunkerError::Tokenizer(_))
        ));
    }
}
