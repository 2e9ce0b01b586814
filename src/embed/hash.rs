use super::EmbeddingProvider;
use crate::lexical::tokenize;

pub const DEFAULT_HASH_DIMENSIONS: usize = 256;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic feature-hashing embedder.
///
/// Each token is hashed (FNV-1a) into one of `dimensions` buckets with a
/// hash-derived sign, and the result is L2-normalised. Texts sharing tokens
/// land close together, which is enough for offline use and tests.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
    name: String,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            name: format!("hash-{}", dimensions),
        }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in tokenize(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIMENSIONS)
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn embed(&mut self, text: &str) -> crate::error::Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(FNV_OFFSET, |hash, &b| (hash ^ b as u64).wrapping_mul(FNV_PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectordb::cosine_similarity;

    #[test]
    fn test_deterministic_and_normalised() {
        let mut a = HashEmbedder::new(64);
        let mut b = HashEmbedder::new(64);
        let v1 = a.embed("load the manifest file").unwrap();
        let v2 = b.embed("load the manifest file").unwrap();

        assert_eq!(v1, v2);
        assert_eq!(v1.len(), 64);
        let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_tokens_are_closer() {
        let embedder = HashEmbedder::default();
        let query = embedder.embed_text("parse manifest entries");
        let near = embedder.embed_text("fn parse_manifest(entries: &[Entry])");
        let far = embedder.embed_text("render colored progress bar");

        assert!(cosine_similarity(&query, &near) > cosine_similarity(&query, &far));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new(8);
        assert!(embedder.embed_text("  ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_model_name_carries_dimensions() {
        assert_eq!(HashEmbedder::new(32).model_name(), "hash-32");
        assert_eq!(HashEmbedder::default().dimensions(), 256);
    }
}
