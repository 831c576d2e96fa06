use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;

/// Text → vector collaborator.
///
/// Queries and documents may be encoded differently (instruction prefixes,
/// normalisation), so the two entry points are separate.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Length of every vector this embedder produces
    fn dimension(&self) -> usize;

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| VectorStoreError::upstream("embedding", "empty response"))?;
        ensure_dimension(self.dimension(), &vector)?;
        Ok(vector)
    }
}

/// Fail fast on a vector of the wrong length
pub fn ensure_dimension(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(VectorStoreError::DimensionMismatch {
            expected,
            actual: vector.len(),
        })
    }
}

/// Scale to unit length; zero vectors are left alone
pub fn l2_normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

/// Deterministic offline embedder for tests and `CHUNKIT_EMBEDDING_MODE=stub`.
///
/// Hashed bag of lowercased words, so texts sharing words land close together.
#[derive(Debug, Clone, Copy)]
pub struct StubEmbedder {
    dimension: usize,
}

impl StubEmbedder {
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    #[must_use]
    pub fn embed(&self, text: &str) -> Vec<f32> {
        stub_embed(text, self.dimension)
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut vec = vec![0.0f32; dimension];
    if dimension == 0 {
        return vec;
    }

    let mut any = false;
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
    {
        let mut state = fnv1a_64(word.to_lowercase().as_bytes());
        let bits = splitmix64(&mut state);
        let slot = (bits % dimension as u64) as usize;
        let sign = if bits >> 63 == 0 { 1.0 } else { -1.0 };
        vec[slot] += sign;
        any = true;
    }

    if !any {
        let mut state =
            fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        for value in &mut vec {
            let bits = splitmix64(&mut state);
            let mantissa = ((bits >> 32) as u32) >> 9;
            let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
            *value = unit.mul_add(2.0, -1.0);
        }
    }

    l2_normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distance(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
    }

    #[test]
    fn stub_is_deterministic_and_normalised() {
        let embedder = StubEmbedder::new(64);
        let a = embedder.embed("Campus mail login");
        let b = embedder.embed("campus MAIL login");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_words_are_closer() {
        let embedder = StubEmbedder::new(256);
        let query = embedder.embed("library opening hours");
        let near = embedder.embed("the library opening hours are 8 to 22");
        let far = embedder.embed("gym membership fees");
        assert!(distance(&query, &near) < distance(&query, &far));
    }

    #[test]
    fn punctuation_only_text_still_gets_a_unit_vector() {
        let vec = StubEmbedder::new(16).embed("?!");
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn query_embedding_matches_document_embedding() {
        let embedder = StubEmbedder::new(32);
        let docs = embedder
            .embed_documents(&["hello world".to_string()])
            .await
            .unwrap();
        let query = embedder.embed_query("hello world").await.unwrap();
        assert_eq!(docs[0], query);
    }

    #[test]
    fn dimension_check() {
        assert!(ensure_dimension(3, &[0.0; 3]).is_ok());
        assert!(matches!(
            ensure_dimension(3, &[0.0; 2]),
            Err(VectorStoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn normalize_leaves_zero_vector() {
        let mut zero = vec![0.0; 4];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0; 4]);
    }
}
