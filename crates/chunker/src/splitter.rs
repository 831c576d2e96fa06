use crate::config::ChunkerConfig;
use crate::error::Result;
use crate::length::{LengthFunction, WordCounter};
use std::collections::VecDeque;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

/// Recursive separator splitter
pub struct Chunker {
    config: ChunkerConfig,
    length: Arc<dyn LengthFunction>,
}

impl Chunker {
    /// Create a chunker that measures segments in Unicode words
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        Self::with_length_function(config, Arc::new(WordCounter))
    }

    /// Create a chunker with an injected length function
    pub fn with_length_function(
        config: ChunkerConfig,
        length: Arc<dyn LengthFunction>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, length })
    }

    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Length of `text` as seen by the budget
    #[must_use]
    pub fn measure(&self, text: &str) -> usize {
        self.length.measure(text)
    }

    /// Split `text` into ordered, overlapping segments within the token budget.
    ///
    /// Blank input yields no segments; input that already fits yields exactly
    /// one (trimmed) segment.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, &self.config.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let (pieces, remaining) = pick_split(text, separators);

        let mut segments = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();
        for piece in pieces {
            if self.measure(piece) <= self.config.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                segments.extend(self.merge(&fitting));
                fitting.clear();
            }

            if remaining.is_empty() {
                log::warn!(
                    "Segment of {} tokens exceeds chunk_size {} and cannot be split further",
                    self.measure(piece),
                    self.config.chunk_size
                );
                push_trimmed(&mut segments, piece);
            } else {
                segments.extend(self.split_recursive(piece, remaining));
            }
        }

        if !fitting.is_empty() {
            segments.extend(self.merge(&fitting));
        }

        segments
    }

    /// Greedily pack pieces into segments, carrying a tail window of at most
    /// `chunk_overlap` tokens into the next segment.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut segments = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = self.measure(piece);
            if total + len > size && !window.is_empty() {
                push_joined(&mut segments, &window);
                while total > overlap || (total > 0 && total + len > size) {
                    let Some((_, front)) = window.pop_front() else {
                        break;
                    };
                    total -= front;
                }
            }
            window.push_back((piece, len));
            total += len;
        }

        push_joined(&mut segments, &window);
        segments
    }
}

/// Use the first separator that produces at least two pieces; the empty
/// separator always applies.
fn pick_split<'t, 's>(text: &'t str, separators: &'s [String]) -> (Vec<&'t str>, &'s [String]) {
    for (idx, separator) in separators.iter().enumerate() {
        let pieces = split_keeping_separator(text, separator);
        if pieces.len() >= 2 || separator.is_empty() {
            return (pieces, &separators[idx + 1..]);
        }
    }
    (split_keeping_separator(text, ""), &[])
}

/// Separators stay attached to the end of the piece they terminate, so
/// sentence punctuation survives the split.
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text.graphemes(true).collect();
    }
    text.split_inclusive(separator)
        .filter(|piece| !piece.is_empty())
        .collect()
}

fn push_joined(segments: &mut Vec<String>, window: &VecDeque<(&str, usize)>) {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    push_trimmed(segments, &joined);
}

fn push_trimmed(segments: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
}
