use async_trait::async_trait;

use crate::error::Result;

/// Source of query and node embeddings.
///
/// Implementations wrap whatever model or service produces the vectors;
/// the search layer only requires that equal inputs yield equal outputs
/// within one index lifetime.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    async fn create_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Dimensionality of the produced vectors.
    fn dimensions(&self) -> usize;
}

/// Deterministic offline embedder.
///
/// Hashes each text into a seeded pseudo-random unit vector: equal texts
/// map to equal vectors, distinct texts to uncorrelated ones. It carries
/// no semantic signal and stands in wherever no model-backed embedder is
/// wired up, tests included.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut state = fnv1a_64(text.as_bytes()) ^ (self.dimensions as u64).wrapping_mul(GAMMA);
        let mut vector = Vec::with_capacity(self.dimensions);
        for _ in 0..self.dimensions {
            let bits = splitmix64(&mut state);
            // Top 24 bits give a uniform value in [0, 1); spread to [-1, 1).
            let unit = (bits >> 40) as f32 / (1u32 << 24) as f32;
            vector.push(unit.mul_add(2.0, -1.0));
        }
        normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn create_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

const GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(GAMMA);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_equal_texts_embed_identically() {
        let embedder = HashingEmbedder::new(16);
        let texts = vec!["fn main() {}".to_string(), "fn main() {}".to_string()];
        let vectors = embedder.create_embeddings(&texts).await.unwrap();
        assert_eq!(vectors[0], vectors[1]);
    }

    #[tokio::test]
    async fn test_distinct_texts_embed_differently() {
        let embedder = HashingEmbedder::new(16);
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let vectors = embedder.create_embeddings(&texts).await.unwrap();
        assert_ne!(vectors[0], vectors[1]);
    }

    #[tokio::test]
    async fn test_vectors_have_unit_norm_and_requested_dimensions() {
        let embedder = HashingEmbedder::new(32);
        let vectors = embedder
            .create_embeddings(&["let x = 1;".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].len(), 32);
        assert_eq!(embedder.dimensions(), 32);

        let norm: f32 = vectors[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "norm was {norm}");
    }

    #[tokio::test]
    async fn test_batch_preserves_input_order() {
        let embedder = HashingEmbedder::new(8);
        let texts = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let batch = embedder.create_embeddings(&texts).await.unwrap();

        for (text, vector) in texts.iter().zip(&batch) {
            let single = embedder.create_embeddings(&[text.clone()]).await.unwrap();
            assert_eq!(&single[0], vector);
        }
    }
}
