use moka::sync::Cache;
use std::sync::Arc;

use super::EmbeddingProvider;

/// Embedding provider wrapped with a content-hash keyed cache, so identical
/// chunk texts are embedded once per run.
pub struct CachedEmbedder {
    inner: Box<dyn EmbeddingProvider>,
    cache: Cache<String, Arc<Vec<f32>>>,
    hits: u64,
    misses: u64,
}

impl CachedEmbedder {
    pub fn new(inner: Box<dyn EmbeddingProvider>, max_entries: u64) -> Self {
        Self {
            inner,
            cache: Cache::new(max_entries.max(1)),
            hits: 0,
            misses: 0,
        }
    }

    /// Embed `text`, reusing the vector cached under `key` (the content hash)
    pub fn embed_keyed(&mut self, key: &str, text: &str) -> crate::error::Result<Arc<Vec<f32>>> {
        if let Some(vector) = self.cache.get(key) {
            self.hits += 1;
            return Ok(vector);
        }

        self.misses += 1;
        let vector = Arc::new(self.inner.embed(text)?);
        self.cache.insert(key.to_string(), vector.clone());
        Ok(vector)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
        }
    }
}

impl EmbeddingProvider for CachedEmbedder {
    fn embed(&mut self, text: &str) -> crate::error::Result<Vec<f32>> {
        self.inner.embed(text)
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
