use async_trait::async_trait;
use chunkit_vector_store::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

/// Second-pass relevance scorer over a small candidate set
#[async_trait]
pub trait Reranker: Send + Sync {
    /// One score per candidate, in candidate order; higher is more relevant
    async fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Config {
    pub k1: f32,
    pub b: f32,
    /// Tokens considered per candidate
    pub window: usize,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self {
            k1: 1.2,
            b: 0.75,
            window: 180,
        }
    }
}

/// Local lexical reranker for deployments without a cross-encoder
#[derive(Clone, Debug, Default)]
pub struct Bm25Reranker {
    cfg: Bm25Config,
}

impl Bm25Reranker {
    #[must_use]
    pub const fn new(cfg: Bm25Config) -> Self {
        Self { cfg }
    }

    #[must_use]
    pub fn score_sync(&self, query: &str, candidates: &[String]) -> Vec<f32> {
        let query_tokens = tokenize(query, usize::MAX);
        if query_tokens.is_empty() {
            return vec![0.0; candidates.len()];
        }
        let bm25 = Bm25Context::build(&self.cfg, candidates, &query_tokens);
        (0..candidates.len())
            .map(|idx| bm25.score(idx, &query_tokens))
            .collect()
    }
}

#[async_trait]
impl Reranker for Bm25Reranker {
    async fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>> {
        Ok(self.score_sync(query, candidates))
    }
}

struct Bm25Context<'a> {
    cfg: &'a Bm25Config,
    docs: Vec<Vec<String>>,
    doc_freq: HashMap<&'a str, usize>,
    avg_len: f32,
}

impl<'a> Bm25Context<'a> {
    fn build(cfg: &'a Bm25Config, candidates: &[String], query_tokens: &'a [String]) -> Self {
        let query_terms: HashSet<&str> = query_tokens.iter().map(String::as_str).collect();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        let mut total_len = 0usize;

        let docs: Vec<Vec<String>> = candidates
            .iter()
            .map(|content| tokenize(content, cfg.window))
            .collect();

        for tokens in &docs {
            total_len += tokens.len();
            let present: HashSet<&str> = tokens
                .iter()
                .map(String::as_str)
                .filter(|token| query_terms.contains(token))
                .collect();
            for term in &query_terms {
                if present.contains(term) {
                    *doc_freq.entry(*term).or_insert(0) += 1;
                }
            }
        }

        let doc_count = docs.len().max(1);
        let avg_len = (total_len as f32) / doc_count as f32;

        Self {
            cfg,
            docs,
            doc_freq,
            avg_len,
        }
    }

    fn score(&self, idx: usize, query_tokens: &[String]) -> f32 {
        let Some(doc_tokens) = self.docs.get(idx) else {
            return 0.0;
        };
        if doc_tokens.is_empty() {
            return 0.0;
        }

        let dl = doc_tokens.len() as f32;
        let total_docs = self.docs.len().max(1) as f32;
        let mut score = 0.0;

        for token in unique(query_tokens) {
            let freq = term_frequency(doc_tokens, token);
            if freq <= 0.0 {
                continue;
            }
            let df = *self.doc_freq.get(token).unwrap_or(&0) as f32;
            let idf = bm25_idf(total_docs, df);
            let denom = freq
                + self.cfg.k1 * (1.0 - self.cfg.b + self.cfg.b * dl / self.avg_len.max(1e-3));
            if denom > 0.0 {
                score += idf * (freq * (self.cfg.k1 + 1.0)) / denom;
            }
        }

        score
    }
}

/// Lowercased Unicode words; single ASCII characters are noise
fn tokenize(content: &str, window: usize) -> Vec<String> {
    content
        .unicode_words()
        .filter(|word| !(word.len() == 1 && word.is_ascii()))
        .map(str::to_lowercase)
        .take(window)
        .collect()
}

fn unique(tokens: &[String]) -> impl Iterator<Item = &str> {
    let mut seen = HashSet::new();
    tokens
        .iter()
        .map(String::as_str)
        .filter(move |token| seen.insert(*token))
}

fn term_frequency(doc_tokens: &[String], needle: &str) -> f32 {
    doc_tokens
        .iter()
        .filter(|token| token.as_str() == needle)
        .count() as f32
}

fn bm25_idf(total_docs: f32, df: f32) -> f32 {
    ((total_docs - df + 0.5) / (df + 0.5) + 1.0).ln()
}
